use crate::gpu::device::Device;
use crate::gpu::driver::native::{native, Driver};
use crate::gpu::driver::types::{NativeHandle, NativeSamplerDesc, NativeTextureDesc};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::structs::{AddressMode, CompareOp, GPUFormat, MemoryUsage, SamplerFilter, TextureType};
use crate::utils::Handle;

#[cfg(feature = "tessera-serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct TextureInfo<'a> {
    pub debug_name: &'a str,
    pub texture_type: TextureType,
    pub format: GPUFormat,
    pub size: [u32; 3],
    pub mips: u32,
    pub layers: u32,
    pub usage: MemoryUsage,
    pub samples: u32,
    /// Contents of mip 0 for every layer, tightly packed.
    pub initial_data: Option<&'a [u8]>,
}

impl<'a> Default for TextureInfo<'a> {
    fn default() -> Self {
        Self {
            debug_name: "",
            texture_type: TextureType::Tex2D,
            format: GPUFormat::RGBA8,
            size: [1280, 1024, 1],
            mips: 1,
            layers: 1,
            usage: MemoryUsage::empty(),
            samples: 1,
            initial_data: None,
        }
    }
}

#[derive(Debug)]
pub struct Texture {
    texture_type: TextureType,
    format: GPUFormat,
    size: [u32; 3],
    mips: u32,
    layers: u32,
    usage: MemoryUsage,
    samples: u32,
    pub(crate) native: NativeHandle,
}

impl Texture {
    #[inline]
    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    #[inline]
    pub fn format(&self) -> GPUFormat {
        self.format
    }

    #[inline]
    pub fn size(&self) -> [u32; 3] {
        self.size
    }

    #[inline]
    pub fn mips(&self) -> u32 {
        self.mips
    }

    #[inline]
    pub fn layers(&self) -> u32 {
        self.layers
    }

    #[inline]
    pub fn usage(&self) -> MemoryUsage {
        self.usage
    }

    #[inline]
    pub fn samples(&self) -> u32 {
        self.samples
    }
}

fn is_multisampled(t: TextureType) -> bool {
    matches!(t, TextureType::Tex2DMS | TextureType::Tex2DMSArray)
}

fn max_mips(size: [u32; 3]) -> u32 {
    let largest = size.iter().copied().max().unwrap_or(1).max(1);
    32 - largest.leading_zeros()
}

/// Mip and layer window a texture is viewed through.
///
/// A count of zero means "every remaining level/layer". `view_type` of
/// `None` reuses the texture's own type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct TextureRange {
    pub min_level: u32,
    pub level_count: u32,
    pub min_layer: u32,
    pub layer_count: u32,
    pub view_type: Option<TextureType>,
}

impl TextureRange {
    pub fn levels(min_level: u32, level_count: u32) -> Self {
        Self {
            min_level,
            level_count,
            ..Default::default()
        }
    }

    pub fn layers(mut self, min_layer: u32, layer_count: u32) -> Self {
        self.min_layer = min_layer;
        self.layer_count = layer_count;
        self
    }

    pub fn view_as(mut self, view_type: TextureType) -> Self {
        self.view_type = Some(view_type);
        self
    }

    /// Replaces every implicit field with a concrete value for `texture`.
    pub fn resolve(&self, texture: &Texture) -> Result<TextureRange> {
        if self.min_level >= texture.mips || self.min_layer >= texture.layers {
            return Err(GPUError::invalid(format!(
                "range starts at mip {} layer {} outside a texture with {} mips and {} layers",
                self.min_level, self.min_layer, texture.mips, texture.layers
            )));
        }

        let level_count = match self.level_count {
            0 => texture.mips - self.min_level,
            n => n,
        };
        let layer_count = match self.layer_count {
            0 => texture.layers - self.min_layer,
            n => n,
        };

        let levels_fit = self
            .min_level
            .checked_add(level_count)
            .is_some_and(|end| end <= texture.mips);
        let layers_fit = self
            .min_layer
            .checked_add(layer_count)
            .is_some_and(|end| end <= texture.layers);
        if !levels_fit || !layers_fit {
            return Err(GPUError::invalid(format!(
                "range of {level_count} mips and {layer_count} layers overflows the texture"
            )));
        }

        Ok(TextureRange {
            min_level: self.min_level,
            level_count,
            min_layer: self.min_layer,
            layer_count,
            view_type: Some(self.view_type.unwrap_or(texture.texture_type)),
        })
    }
}

//===----------------------------------------------------------------------===//
// Samplers
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct SamplerInfo {
    pub min_filter: SamplerFilter,
    pub mag_filter: SamplerFilter,
    pub mip_filter: SamplerFilter,
    pub address: [AddressMode; 3],
    pub anisotropy: f32,
    /// Depth comparison for shadow lookups.
    pub compare: Option<CompareOp>,
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerInfo {
    fn default() -> Self {
        Self {
            min_filter: SamplerFilter::Linear,
            mag_filter: SamplerFilter::Linear,
            mip_filter: SamplerFilter::Linear,
            address: [AddressMode::Repeat; 3],
            anisotropy: 1.0,
            compare: None,
            min_lod: 0.0,
            max_lod: 1000.0,
        }
    }
}

#[derive(Debug)]
pub struct Sampler {
    info: SamplerInfo,
    pub(crate) native: NativeHandle,
}

impl Sampler {
    #[inline]
    pub fn info(&self) -> &SamplerInfo {
        &self.info
    }
}

impl<D: Driver> Device<D> {
    pub fn make_texture(&mut self, info: &TextureInfo) -> Result<Handle<Texture>> {
        let name = info.debug_name;
        if info.size.contains(&0) {
            return Err(GPUError::invalid(format!(
                "texture '{name}' has an empty extent {:?}",
                info.size
            )));
        }
        if info.layers == 0 {
            return Err(GPUError::invalid(format!("texture '{name}' has no layers")));
        }
        if info.mips == 0 || info.mips > max_mips(info.size) {
            return Err(GPUError::invalid(format!(
                "texture '{name}' requests {} mips, at most {} fit",
                info.mips,
                max_mips(info.size)
            )));
        }
        if is_multisampled(info.texture_type) != (info.samples > 1) {
            return Err(GPUError::invalid(format!(
                "texture '{name}' of type {:?} cannot have {} samples",
                info.texture_type, info.samples
            )));
        }
        if info.samples > self.driver.max_samples() {
            return Err(GPUError::invalid(format!(
                "texture '{name}' requests {} samples, the driver allows {}",
                info.samples,
                self.driver.max_samples()
            )));
        }
        if let Some(data) = info.initial_data {
            let [w, h, d] = info.size;
            let expected = w as u64 * h as u64 * d as u64 * info.layers as u64 * info.format.stride() as u64;
            if data.len() as u64 > expected {
                return Err(GPUError::invalid(format!(
                    "texture '{name}' initial data ({} bytes) exceeds mip 0 ({expected} bytes)",
                    data.len()
                )));
            }
        }

        let desc = NativeTextureDesc {
            label: name,
            target: native(&self.driver, info.texture_type)?,
            format: native(&self.driver, info.format)?,
            size: info.size,
            mips: info.mips,
            layers: info.layers,
            samples: info.samples,
            data: info.initial_data,
        };
        let handle = self.driver.create_texture(&desc);

        self.register(
            name,
            Texture {
                texture_type: info.texture_type,
                format: info.format,
                size: info.size,
                mips: info.mips,
                layers: info.layers,
                usage: info.usage,
                samples: info.samples,
                native: handle,
            },
        )
    }

    pub fn make_sampler(&mut self, name: &str, info: &SamplerInfo) -> Result<Handle<Sampler>> {
        if info.anisotropy < 1.0 {
            return Err(GPUError::invalid(format!(
                "sampler '{name}' anisotropy must be at least 1, got {}",
                info.anisotropy
            )));
        }
        if info.min_lod > info.max_lod {
            return Err(GPUError::invalid(format!(
                "sampler '{name}' lod range {}..{} is inverted",
                info.min_lod, info.max_lod
            )));
        }

        let compare = match info.compare {
            Some(c) => Some(native(&self.driver, c)?),
            None => None,
        };
        let desc = NativeSamplerDesc {
            label: name,
            min_filter: native(&self.driver, info.min_filter)?,
            mag_filter: native(&self.driver, info.mag_filter)?,
            mip_filter: native(&self.driver, info.mip_filter)?,
            address: [
                native(&self.driver, info.address[0])?,
                native(&self.driver, info.address[1])?,
                native(&self.driver, info.address[2])?,
            ],
            anisotropy: info.anisotropy,
            compare,
            lod: [info.min_lod, info.max_lod],
        };
        let handle = self.driver.create_sampler(&desc);

        self.register(
            name,
            Sampler {
                info: *info,
                native: handle,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(mips: u32, layers: u32) -> Texture {
        Texture {
            texture_type: TextureType::Tex2DArray,
            format: GPUFormat::RGBA8,
            size: [256, 256, 1],
            mips,
            layers,
            usage: MemoryUsage::empty(),
            samples: 1,
            native: 1,
        }
    }

    #[test]
    fn mip_chain_length() {
        assert_eq!(max_mips([1, 1, 1]), 1);
        assert_eq!(max_mips([256, 128, 1]), 9);
        assert_eq!(max_mips([300, 1, 1]), 9);
    }

    #[test]
    fn default_range_covers_everything() {
        let r = TextureRange::default().resolve(&texture(5, 3)).unwrap();
        assert_eq!(r.level_count, 5);
        assert_eq!(r.layer_count, 3);
        assert_eq!(r.view_type, Some(TextureType::Tex2DArray));
    }

    #[test]
    fn huge_counts_do_not_wrap() {
        let t = texture(5, 3);
        assert!(matches!(
            TextureRange::levels(1, u32::MAX).resolve(&t),
            Err(GPUError::InvalidInfo(_))
        ));
        assert!(TextureRange::default().layers(2, u32::MAX).resolve(&t).is_err());
        assert!(TextureRange::levels(1, 4).layers(2, 1).resolve(&t).is_ok());
    }

    #[test]
    fn partial_range() {
        let r = TextureRange::levels(2, 0)
            .layers(1, 1)
            .view_as(TextureType::Tex2D)
            .resolve(&texture(5, 3))
            .unwrap();
        assert_eq!((r.min_level, r.level_count), (2, 3));
        assert_eq!((r.min_layer, r.layer_count), (1, 1));
        assert_eq!(r.view_type, Some(TextureType::Tex2D));
    }

    #[test]
    fn out_of_bounds_range() {
        let tex = texture(2, 1);
        assert!(TextureRange::levels(2, 1).resolve(&tex).is_err());
        assert!(TextureRange::levels(1, 2).resolve(&tex).is_err());
        assert!(TextureRange::default().layers(0, 2).resolve(&tex).is_err());
    }
}
