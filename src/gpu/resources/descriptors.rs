use std::collections::HashMap;

use super::buffer::GPUBuffer;
use super::texture::{Sampler, Texture, TextureRange};
use crate::gpu::device::Device;
use crate::gpu::driver::native::Driver;
use crate::gpu::error::{GPUError, Result};
use crate::gpu::object::AnyHandle;
use crate::gpu::structs::BufferKind;
use crate::utils::Handle;

#[cfg(feature = "tessera-serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum ResourceType {
    /// Uniform block.
    CBuffer,
    /// Storage block.
    Buffer,
    Texture,
    Sampler,
}

/// One resource slot declared by a shader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct RegisterLayout {
    pub name: String,
    /// Identifies the slot across every stage of the pipeline.
    pub global_id: u32,
    /// Native binding point.
    pub local_id: u32,
    pub kind: ResourceType,
    pub writable: bool,
}

impl RegisterLayout {
    pub fn new(name: &str, global_id: u32, local_id: u32, kind: ResourceType) -> Self {
        Self {
            name: name.to_string(),
            global_id,
            local_id,
            kind,
            writable: false,
        }
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct PipelineLayout {
    entries: Vec<RegisterLayout>,
}

impl PipelineLayout {
    pub fn new(entries: Vec<RegisterLayout>) -> Result<Self> {
        for (i, e) in entries.iter().enumerate() {
            if entries[..i].iter().any(|o| o.global_id == e.global_id) {
                return Err(GPUError::invalid(format!(
                    "slot '{}' reuses global id {}",
                    e.name, e.global_id
                )));
            }
        }
        Ok(Self { entries })
    }

    #[inline]
    pub fn entries(&self) -> &[RegisterLayout] {
        &self.entries
    }

    pub fn find(&self, global_id: u32) -> Option<&RegisterLayout> {
        self.entries.iter().find(|e| e.global_id == global_id)
    }
}

/// A resource as requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subresource {
    /// A `size` of zero extends to the end of the buffer.
    Buffer {
        buffer: Handle<GPUBuffer>,
        offset: u64,
        size: u64,
    },
    Texture {
        texture: Handle<Texture>,
        range: TextureRange,
        sampler: Option<Handle<Sampler>>,
    },
    Sampler(Handle<Sampler>),
}

impl Subresource {
    pub fn buffer(buffer: Handle<GPUBuffer>) -> Self {
        Subresource::Buffer {
            buffer,
            offset: 0,
            size: 0,
        }
    }

    pub fn buffer_range(buffer: Handle<GPUBuffer>, offset: u64, size: u64) -> Self {
        Subresource::Buffer { buffer, offset, size }
    }

    pub fn texture(texture: Handle<Texture>, sampler: Option<Handle<Sampler>>) -> Self {
        Subresource::Texture {
            texture,
            range: TextureRange::default(),
            sampler,
        }
    }

    fn references(&self) -> impl Iterator<Item = AnyHandle> {
        let (a, b) = match *self {
            Subresource::Buffer { buffer, .. } => (AnyHandle::Buffer(buffer), None),
            Subresource::Texture { texture, sampler, .. } => {
                (AnyHandle::Texture(texture), sampler.map(AnyHandle::Sampler))
            }
            Subresource::Sampler(s) => (AnyHandle::Sampler(s), None),
        };
        std::iter::once(a).chain(b)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorsInfo {
    pub layout: PipelineLayout,
    /// Keyed by [`RegisterLayout::global_id`].
    pub resources: HashMap<u32, Subresource>,
}

impl DescriptorsInfo {
    pub fn new(layout: PipelineLayout) -> Self {
        Self {
            layout,
            resources: HashMap::new(),
        }
    }

    pub fn with(mut self, global_id: u32, resource: Subresource) -> Self {
        self.resources.insert(global_id, resource);
        self
    }
}

/// Resources for every slot of a layout, bound as a whole.
///
/// Buffer sizes and texture ranges are stored resolved. Each referenced
/// resource carries one reference owned by this object.
#[derive(Debug)]
pub struct Descriptors {
    layout: PipelineLayout,
    resources: HashMap<u32, Subresource>,
}

impl Descriptors {
    #[inline]
    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }

    pub fn resource(&self, global_id: u32) -> Option<&Subresource> {
        self.resources.get(&global_id)
    }

    pub(crate) fn references(&self) -> impl Iterator<Item = AnyHandle> + '_ {
        self.resources.values().flat_map(Subresource::references)
    }
}

impl<D: Driver> Device<D> {
    pub fn make_descriptors(&mut self, name: &str, info: DescriptorsInfo) -> Result<Handle<Descriptors>> {
        let mut resources = HashMap::with_capacity(info.resources.len());
        for (&global_id, resource) in &info.resources {
            let slot = info.layout.find(global_id).ok_or_else(|| {
                GPUError::invalid(format!(
                    "descriptors '{name}' bind global id {global_id} which the layout does not declare"
                ))
            })?;
            resources.insert(global_id, self.resolve_subresource(name, slot, resource)?);
        }

        for r in resources.values() {
            for h in r.references() {
                self.add_ref_any(h)?;
            }
        }

        self.register(
            name,
            Descriptors {
                layout: info.layout,
                resources,
            },
        )
    }

    /// Replaces the resource of one slot, moving references accordingly.
    pub fn set_descriptor(
        &mut self,
        descriptors: Handle<Descriptors>,
        global_id: u32,
        resource: Subresource,
    ) -> Result<()> {
        let d = self.objects.get(descriptors)?;
        let name = d.name().to_string();
        let slot = d.layout.find(global_id).cloned().ok_or_else(|| {
            GPUError::invalid(format!(
                "descriptors '{name}' have no slot with global id {global_id}"
            ))
        })?;
        let resolved = self.resolve_subresource(&name, &slot, &resource)?;

        for h in resolved.references() {
            self.add_ref_any(h)?;
        }
        let old = self
            .objects
            .get_mut(descriptors)?
            .resources
            .insert(global_id, resolved);
        if let Some(old) = old {
            for h in old.references() {
                self.lose_ref_any(h)?;
            }
        }

        Ok(())
    }

    fn resolve_subresource(
        &self,
        name: &str,
        slot: &RegisterLayout,
        resource: &Subresource,
    ) -> Result<Subresource> {
        match (slot.kind, *resource) {
            (ResourceType::CBuffer | ResourceType::Buffer, Subresource::Buffer { buffer, offset, size }) => {
                let b = self.objects.get(buffer)?;
                let expected = match slot.kind {
                    ResourceType::CBuffer => BufferKind::Uniform,
                    _ => BufferKind::Storage,
                };
                if b.kind() != expected {
                    return Err(GPUError::invalid(format!(
                        "descriptors '{name}' slot '{}' needs a {expected:?} buffer, '{}' is {:?}",
                        slot.name,
                        b.name(),
                        b.kind()
                    )));
                }

                let size = if size == 0 {
                    b.byte_size().saturating_sub(offset)
                } else {
                    size
                };
                if size == 0 || offset + size > b.byte_size() {
                    return Err(GPUError::invalid(format!(
                        "descriptors '{name}' slot '{}' range {offset}+{size} exceeds buffer '{}' ({} bytes)",
                        slot.name,
                        b.name(),
                        b.byte_size()
                    )));
                }

                Ok(Subresource::Buffer { buffer, offset, size })
            }
            (ResourceType::Texture, Subresource::Texture { texture, range, sampler }) => {
                let range = range.resolve(self.objects.get(texture)?)?;
                if let Some(s) = sampler {
                    self.objects.get(s)?;
                }
                Ok(Subresource::Texture {
                    texture,
                    range,
                    sampler,
                })
            }
            (ResourceType::Sampler, Subresource::Sampler(s)) => {
                self.objects.get(s)?;
                Ok(Subresource::Sampler(s))
            }
            (kind, _) => Err(GPUError::invalid(format!(
                "descriptors '{name}' slot '{}' of kind {kind:?} cannot hold {resource:?}",
                slot.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_global_ids_are_rejected() {
        let err = PipelineLayout::new(vec![
            RegisterLayout::new("a", 0, 0, ResourceType::CBuffer),
            RegisterLayout::new("b", 0, 1, ResourceType::Texture),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn find_by_global_id() {
        let layout = PipelineLayout::new(vec![
            RegisterLayout::new("camera", 3, 0, ResourceType::CBuffer),
            RegisterLayout::new("albedo", 7, 2, ResourceType::Texture).writable(),
        ])
        .unwrap();
        assert_eq!(layout.find(7).map(|e| e.local_id), Some(2));
        assert!(layout.find(7).unwrap().writable);
        assert!(layout.find(1).is_none());
    }

    #[test]
    fn texture_references_include_sampler() {
        let t = Handle::<Texture>::new(0, 1);
        let s = Handle::<Sampler>::new(1, 1);
        let refs: Vec<_> = Subresource::texture(t, Some(s)).references().collect();
        assert_eq!(refs, vec![AnyHandle::Texture(t), AnyHandle::Sampler(s)]);
    }
}
