use log::debug;

use crate::gpu::driver::native::Driver;
use crate::gpu::driver::state::BindCategory;
use crate::gpu::driver::types::*;
use crate::gpu::error::Result;
use crate::gpu::resources::{BufferAttributes, PrimitiveBuffer};
use crate::gpu::structs::ComponentType;
use crate::utils::Handle;

use super::engine::Translator;

impl<'a, D: Driver> Translator<'a, D> {
    fn native_attributes(&self, layout: &BufferAttributes) -> Result<Vec<NativeAttribute>> {
        layout
            .attributes()
            .iter()
            .map(|a| {
                let component = a.format.component_type();
                Ok(NativeAttribute {
                    location: a.location,
                    components: a.format.channels(),
                    kind: self.native(Abstract::AttributeType(a.format))?,
                    normalized: matches!(
                        component,
                        ComponentType::Unorm | ComponentType::Snorm | ComponentType::Srgb
                    ),
                    integer: matches!(component, ComponentType::Uint | ComponentType::Sint),
                    offset: a.offset,
                })
            })
            .collect()
    }

    /// Binds the vertex array describing `buffer`, building it the first
    /// time this context sees the primitive buffer.
    pub(crate) fn bind_vertex_layout(&mut self, buffer: Handle<PrimitiveBuffer>) -> Result<()> {
        let vao = match self.ctx.vertex_arrays.get(&buffer) {
            Some(&vao) => vao,
            None => {
                let pb = self.objects.get(buffer)?;
                let mut bindings = Vec::with_capacity(pb.vertex_layouts().len());
                for layout in pb.vertex_layouts() {
                    bindings.push(NativeVertexBinding {
                        buffer: self.objects.get(layout.buffer)?.native,
                        offset: layout.offset,
                        stride: layout.attributes.stride(),
                        instanced: layout.attributes.is_instanced(),
                        attributes: self.native_attributes(&layout.attributes)?,
                    });
                }
                let index_buffer = match pb.index_layout() {
                    Some(l) => Some(self.objects.get(l.buffer)?.native),
                    None => None,
                };

                let desc = NativeVertexArrayDesc {
                    label: pb.name(),
                    bindings,
                    index_buffer,
                };
                let vao = self.driver.create_vertex_array(&desc);
                debug!(
                    "created vertex array {vao} for '{}' ({} streams)",
                    pb.name(),
                    desc.bindings.len()
                );
                self.ctx.vertex_arrays.insert(buffer, vao);
                vao
            }
        };

        if self.ctx.bind(BindCategory::VertexArray, vao) {
            self.driver.issue(NativeCall::BindVertexArray(vao));
        }
        Ok(())
    }
}
