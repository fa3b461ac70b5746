use log::{debug, trace};

use crate::gpu::driver::native::Driver;
use crate::gpu::driver::state::{BindCategory, BoundRange};
use crate::gpu::driver::types::*;
use crate::gpu::error::Result;
use crate::gpu::resources::{Descriptors, ResourceType, Subresource, Texture, TextureRange};
use crate::utils::Handle;

use super::engine::Translator;

impl<'a, D: Driver> Translator<'a, D> {
    /// Binds every populated slot of `descriptors` at its local index.
    ///
    /// Slots without a resource are left alone. Each bind goes through the
    /// per-slot cache, so rebinding the same set issues nothing.
    pub(crate) fn resolve_descriptors(&mut self, descriptors: Handle<Descriptors>) -> Result<()> {
        let d = self.objects.get(descriptors)?;
        let mut slots = Vec::with_capacity(d.layout().entries().len());
        for entry in d.layout().entries() {
            match d.resource(entry.global_id) {
                Some(r) => slots.push((entry.local_id, entry.kind, entry.writable, *r)),
                None => trace!("slot '{}' of '{}' is unbound", entry.name, d.name()),
            }
        }

        for (unit, kind, writable, resource) in slots {
            match resource {
                Subresource::Buffer { buffer, offset, size } => {
                    let (category, target) = match kind {
                        ResourceType::CBuffer => (BindCategory::UniformBuffer, BufferTarget::Uniform),
                        _ => (BindCategory::StorageBuffer, BufferTarget::Storage),
                    };
                    let native = self.objects.get(buffer)?.native;
                    if self.ctx.bind_range(unit, category, BoundRange { handle: native, offset, size }) {
                        self.driver.issue(NativeCall::BindBufferRange {
                            target,
                            index: unit,
                            buffer: native,
                            offset,
                            size,
                        });
                    }
                }
                Subresource::Texture { texture, range, sampler } => {
                    let view = self.texture_view(texture, range)?;
                    if writable {
                        if self.ctx.bind_range(unit, BindCategory::Image, BoundRange::whole(view)) {
                            let format = self.native(self.objects.get(texture)?.format())?;
                            self.driver.issue(NativeCall::BindImageTexture {
                                unit,
                                texture: view,
                                format,
                            });
                        }
                        continue;
                    }
                    if self.ctx.bind_range(unit, BindCategory::Texture, BoundRange::whole(view)) {
                        self.driver.issue(NativeCall::BindTextureUnit { unit, texture: view });
                    }
                    let sampler = match sampler {
                        Some(s) => self.objects.get(s)?.native,
                        None => 0,
                    };
                    self.bind_sampler(unit, sampler);
                }
                Subresource::Sampler(s) => {
                    let sampler = self.objects.get(s)?.native;
                    self.bind_sampler(unit, sampler);
                }
            }
        }
        Ok(())
    }

    fn bind_sampler(&mut self, unit: u32, sampler: NativeHandle) {
        if self.ctx.bind_range(unit, BindCategory::Sampler, BoundRange::whole(sampler)) {
            self.driver.issue(NativeCall::BindSampler { unit, sampler });
        }
    }

    /// The view of `range` over `texture`, created on first use and kept
    /// until the texture is destroyed.
    fn texture_view(&mut self, texture: Handle<Texture>, range: TextureRange) -> Result<NativeHandle> {
        if let Some(&view) = self.ctx.texture_views.get(&(texture, range)) {
            return Ok(view);
        }

        let t = self.objects.get(texture)?;
        let view_type = range.view_type.unwrap_or(t.texture_type());
        let desc = NativeViewDesc {
            label: t.name(),
            texture: t.native,
            target: self.native(view_type)?,
            format: self.native(t.format())?,
            min_level: range.min_level,
            levels: range.level_count,
            min_layer: range.min_layer,
            layers: range.layer_count,
        };
        let view = self.driver.create_texture_view(&desc);
        debug!(
            "created view {view} of '{}' (mips {}+{}, layers {}+{})",
            t.name(),
            range.min_level,
            range.level_count,
            range.min_layer,
            range.layer_count
        );
        self.ctx.texture_views.insert((texture, range), view);
        Ok(view)
    }
}
