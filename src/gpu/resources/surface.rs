use log::{debug, info};

use crate::gpu::device::Device;
use crate::gpu::driver::native::{native, Driver};
use crate::gpu::driver::types::{
    NativeDepthAttachment, NativeFramebuffer, NativeFramebufferDesc, NativeHandle, NativeObject,
};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::structs::{DepthFormat, GPUFormat};
use crate::utils::Handle;

#[cfg(feature = "tessera-serde")]
use serde::{Deserialize, Serialize};

pub const MAX_COLOR_ATTACHMENTS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct SurfaceInfo {
    /// Ignored for dynamic surfaces.
    pub size: [u32; 2],
    pub color_formats: Vec<GPUFormat>,
    pub depth_format: DepthFormat,
    /// Keep depth in a sampleable texture instead of a renderbuffer.
    pub keep_depth: bool,
    pub samples: u32,
    /// Follow the backbuffer size.
    pub is_dynamic: bool,
    pub viewport_scale: f64,
}

impl SurfaceInfo {
    pub fn fixed(size: [u32; 2], color_formats: &[GPUFormat], depth_format: DepthFormat) -> Self {
        Self {
            size,
            color_formats: color_formats.to_vec(),
            depth_format,
            keep_depth: false,
            samples: 1,
            is_dynamic: false,
            viewport_scale: 1.0,
        }
    }

    /// Sized `floor(viewport_scale * backbuffer)`, following every resize.
    pub fn dynamic(viewport_scale: f64, color_formats: &[GPUFormat], depth_format: DepthFormat) -> Self {
        Self {
            size: [0, 0],
            is_dynamic: true,
            viewport_scale,
            ..Self::fixed([0, 0], color_formats, depth_format)
        }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn keep_depth(mut self) -> Self {
        self.keep_depth = true;
        self
    }
}

pub(crate) fn scaled_size(scale: f64, backbuffer: [u32; 2]) -> [u32; 2] {
    backbuffer.map(|v| (scale * v as f64).floor() as u32)
}

/// A render target and the attachments it owns.
///
/// A surface sized to zero has no attachments and is suspended until the
/// next resize gives it an area.
#[derive(Debug)]
pub struct Surface {
    info: SurfaceInfo,
    size: [u32; 2],
    pub(crate) attachments: Option<NativeFramebuffer>,
}

impl Surface {
    #[inline]
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.info.is_dynamic
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.attachments.is_none()
    }

    #[inline]
    pub fn samples(&self) -> u32 {
        self.info.samples
    }

    #[inline]
    pub fn color_formats(&self) -> &[GPUFormat] {
        &self.info.color_formats
    }

    #[inline]
    pub fn depth_format(&self) -> DepthFormat {
        self.info.depth_format
    }

    /// Native framebuffer, `None` while suspended.
    pub fn framebuffer(&self) -> Option<NativeHandle> {
        self.attachments.as_ref().map(|a| a.framebuffer)
    }

    /// Size this surface wants for the given backbuffer.
    pub fn target_size(&self, backbuffer: [u32; 2]) -> [u32; 2] {
        if self.info.is_dynamic {
            scaled_size(self.info.viewport_scale, backbuffer)
        } else {
            self.size
        }
    }
}

pub(crate) fn attachment_objects(fb: &NativeFramebuffer) -> impl Iterator<Item = NativeObject> + '_ {
    std::iter::once(NativeObject::Framebuffer(fb.framebuffer))
        .chain(fb.colors.iter().map(|c| NativeObject::Texture(*c)))
        .chain(fb.depth)
}

fn allocate<D: Driver>(driver: &mut D, name: &str, info: &SurfaceInfo, size: [u32; 2]) -> Result<Option<NativeFramebuffer>> {
    if size.contains(&0) {
        return Ok(None);
    }

    let mut colors = Vec::with_capacity(info.color_formats.len());
    for f in &info.color_formats {
        colors.push(native(driver, *f)?);
    }
    let depth = match info.depth_format {
        DepthFormat::None => None,
        f => Some(NativeDepthAttachment {
            format: native(driver, f)?,
            as_texture: info.keep_depth,
            has_stencil: f.has_stencil(),
        }),
    };

    let fb = driver
        .create_framebuffer(&NativeFramebufferDesc {
            label: name,
            size,
            samples: info.samples,
            colors,
            depth,
        })
        .map_err(GPUError::IncompleteFramebuffer)?;
    Ok(Some(fb))
}

impl<D: Driver> Device<D> {
    pub fn make_surface(&mut self, name: &str, info: SurfaceInfo) -> Result<Handle<Surface>> {
        if info.color_formats.len() > MAX_COLOR_ATTACHMENTS {
            return Err(GPUError::invalid(format!(
                "surface '{name}' has {} color attachments, at most {MAX_COLOR_ATTACHMENTS} are allowed",
                info.color_formats.len()
            )));
        }
        if info.color_formats.is_empty() && info.depth_format == DepthFormat::None {
            return Err(GPUError::invalid(format!("surface '{name}' has no attachments")));
        }
        if info.samples == 0 {
            return Err(GPUError::invalid(format!("surface '{name}' has zero samples")));
        }
        if info.is_dynamic {
            if !(info.viewport_scale.is_finite() && info.viewport_scale > 0.0) {
                return Err(GPUError::invalid(format!(
                    "surface '{name}' viewport scale {} is not positive",
                    info.viewport_scale
                )));
            }
        } else if info.size.contains(&0) {
            return Err(GPUError::invalid(format!(
                "static surface '{name}' has an empty size {:?}",
                info.size
            )));
        }

        let mut info = info;
        info.samples = info.samples.min(self.driver.max_samples());
        let size = if info.is_dynamic {
            scaled_size(info.viewport_scale, self.backbuffer)
        } else {
            info.size
        };

        let attachments = allocate(&mut self.driver, name, &info, size)?;
        self.register(
            name,
            Surface {
                info,
                size,
                attachments,
            },
        )
    }

    /// Applies a backbuffer size to one surface. Returns whether its
    /// attachments were reallocated.
    pub fn resize_surface(&mut self, surface: Handle<Surface>, backbuffer: [u32; 2]) -> Result<bool> {
        let s = self.objects.get(surface)?;
        let size = s.target_size(backbuffer);
        if !s.is_dynamic() || size == s.size {
            return Ok(false);
        }
        if self.is_render_target(surface) {
            return Err(GPUError::RenderPassActive);
        }

        let s = self.objects.get_mut(surface)?;
        let name = s.name().to_string();
        if let Some(old) = s.attachments.take() {
            for obj in attachment_objects(&old) {
                self.driver.destroy(obj);
            }
            self.forget_framebuffer(old.framebuffer);
        }

        let s = self.objects.get(surface)?;
        let attachments = allocate(&mut self.driver, &name, &s.info, size)?;
        info!("surface '{name}' resized to {size:?}");
        if attachments.is_none() {
            debug!("surface '{name}' suspended");
        }

        let s = self.objects.get_mut(surface)?;
        s.size = size;
        s.attachments = attachments;
        Ok(true)
    }

    /// Records the new backbuffer size and resizes every dynamic surface.
    ///
    /// Fails without touching anything when a dynamic surface is the target
    /// of an active render pass.
    pub fn resize_backbuffer(&mut self, size: [u32; 2]) -> Result<()> {
        let surfaces = self.objects.surfaces.handles();
        for h in &surfaces {
            let h = h.cast::<Surface>();
            let s = self.objects.get(h)?;
            if s.is_dynamic() && s.target_size(size) != s.size() && self.is_render_target(h) {
                return Err(GPUError::RenderPassActive);
            }
        }

        self.backbuffer = size;
        for h in surfaces {
            self.resize_surface(h.cast(), size)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_floors() {
        assert_eq!(scaled_size(0.5, [800, 600]), [400, 300]);
        assert_eq!(scaled_size(0.5, [801, 3]), [400, 1]);
        assert_eq!(scaled_size(1.0 / 3.0, [100, 100]), [33, 33]);
    }

    #[test]
    fn dynamic_info() {
        let info = SurfaceInfo::dynamic(0.25, &[GPUFormat::RGBA8], DepthFormat::D24S8).with_samples(4);
        assert!(info.is_dynamic);
        assert_eq!(info.samples, 4);
        assert_eq!(info.viewport_scale, 0.25);
    }
}
