use super::buffer::{BufferAttributes, BufferInfo, BufferLayout, GPUBuffer, LayoutSource, ResolvedLayout};
use crate::gpu::device::Device;
use crate::gpu::driver::native::Driver;
use crate::gpu::error::{GPUError, Result};
use crate::gpu::structs::{BufferKind, GPUFormat};
use crate::utils::Handle;

#[derive(Debug, Clone, Default)]
pub struct PrimitiveBufferInfo {
    pub vertex_layouts: Vec<BufferLayout>,
    pub index_layout: Option<BufferLayout>,
}

impl PrimitiveBufferInfo {
    pub fn new(vertex_layouts: Vec<BufferLayout>) -> Self {
        Self {
            vertex_layouts,
            index_layout: None,
        }
    }

    pub fn with_indices(mut self, index_layout: BufferLayout) -> Self {
        self.index_layout = Some(index_layout);
        self
    }
}

/// Vertex streams plus optional indices that feed a draw.
///
/// Holds one reference on every buffer it reads from.
#[derive(Debug)]
pub struct PrimitiveBuffer {
    vertex_layouts: Vec<ResolvedLayout>,
    index_layout: Option<ResolvedLayout>,
}

impl PrimitiveBuffer {
    /// Vertices per stream. Every stream agrees on this.
    #[inline]
    pub fn elements(&self) -> u32 {
        self.vertex_layouts.first().map_or(0, |l| l.elements)
    }

    #[inline]
    pub fn vertex_layouts(&self) -> &[ResolvedLayout] {
        &self.vertex_layouts
    }

    #[inline]
    pub fn index_layout(&self) -> Option<&ResolvedLayout> {
        self.index_layout.as_ref()
    }

    pub fn indices(&self) -> u32 {
        self.index_layout.as_ref().map_or(0, |l| l.elements)
    }

    pub fn index_format(&self) -> Option<GPUFormat> {
        self.index_layout
            .as_ref()
            .and_then(|l| l.attributes.attributes().first())
            .map(|a| a.format)
    }

    /// Whether the vertex streams line up with a pipeline's attribute layout.
    pub fn match_layout(&self, candidate: &[BufferAttributes]) -> bool {
        self.vertex_layouts.len() == candidate.len()
            && self
                .vertex_layouts
                .iter()
                .zip(candidate)
                .all(|(l, c)| l.attributes.same_formats(c))
    }

    /// Every buffer this object holds a reference on.
    pub(crate) fn buffers(&self) -> impl Iterator<Item = Handle<GPUBuffer>> + '_ {
        self.vertex_layouts
            .iter()
            .chain(self.index_layout.iter())
            .map(|l| l.buffer)
    }
}

impl<D: Driver> Device<D> {
    pub fn make_primitive_buffer(
        &mut self,
        name: &str,
        info: PrimitiveBufferInfo,
    ) -> Result<Handle<PrimitiveBuffer>> {
        if info.vertex_layouts.is_empty() {
            return Err(GPUError::invalid(format!(
                "primitive buffer '{name}' needs at least one vertex layout"
            )));
        }

        if let Some(index) = &info.index_layout {
            let mut formats = index.attributes.formats();
            match (formats.next(), formats.next()) {
                (Some(f), None) if f.is_index_format() => {}
                _ => {
                    return Err(GPUError::invalid(format!(
                        "primitive buffer '{name}' index layout must be one 16 or 32 bit integer"
                    )))
                }
            }
        }

        // Validate everything before taking any references so failures leak nothing.
        let mut expected = None;
        for layout in &info.vertex_layouts {
            let elements = self.layout_elements(name, layout, BufferKind::Vertex)?;
            match expected {
                None => expected = Some(elements),
                Some(e) if e != elements => {
                    return Err(GPUError::invalid(format!(
                        "primitive buffer '{name}' vertex layouts disagree on element count ({e} vs {elements})"
                    )))
                }
                _ => {}
            }
        }
        if let Some(index) = &info.index_layout {
            self.layout_elements(name, index, BufferKind::Index)?;
        }

        let mut pb = PrimitiveBuffer {
            vertex_layouts: Vec::with_capacity(info.vertex_layouts.len()),
            index_layout: None,
        };
        let resolved = self.resolve_layouts(name, info, &mut pb);
        let held: Vec<_> = pb.buffers().collect();
        match resolved.and_then(|()| self.register(name, pb)) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                for b in held {
                    self.lose_ref(b)?;
                }
                Err(err)
            }
        }
    }

    /// Resolves every layout of `info` into `pb`. On failure `pb` keeps the
    /// layouts resolved so far, and with them their references.
    fn resolve_layouts(&mut self, name: &str, info: PrimitiveBufferInfo, pb: &mut PrimitiveBuffer) -> Result<()> {
        for (i, layout) in info.vertex_layouts.into_iter().enumerate() {
            let label = format!("{name} vertices {i}");
            pb.vertex_layouts
                .push(self.resolve_layout(&label, layout, BufferKind::Vertex)?);
        }
        if let Some(layout) = info.index_layout {
            let label = format!("{name} indices");
            pb.index_layout = Some(self.resolve_layout(&label, layout, BufferKind::Index)?);
        }
        Ok(())
    }

    fn layout_elements(&self, name: &str, layout: &BufferLayout, kind: BufferKind) -> Result<u32> {
        let stride = layout.attributes.stride() as u64;
        if stride == 0 {
            return Err(GPUError::invalid(format!(
                "primitive buffer '{name}' has a layout with zero stride"
            )));
        }

        let bytes = match &layout.source {
            LayoutSource::Data { bytes, .. } => bytes.len() as u64,
            LayoutSource::Buffer { buffer, offset } => {
                let b = self.objects.get(*buffer)?;
                if b.kind() != kind {
                    return Err(GPUError::invalid(format!(
                        "primitive buffer '{name}' adopts '{}' of kind {:?}, expected {:?}",
                        b.name(),
                        b.kind(),
                        kind
                    )));
                }
                b.byte_size().saturating_sub(*offset)
            }
        };

        if bytes == 0 {
            return Err(GPUError::invalid(format!(
                "primitive buffer '{name}' has an empty {kind:?} layout"
            )));
        }

        Ok((bytes / stride) as u32)
    }

    /// Allocates or adopts the buffer behind `layout`, taking one reference.
    fn resolve_layout(&mut self, label: &str, layout: BufferLayout, kind: BufferKind) -> Result<ResolvedLayout> {
        let stride = layout.attributes.stride() as u64;
        let (buffer, offset, bytes) = match layout.source {
            LayoutSource::Data { bytes, usage } => {
                let buffer = self.make_buffer(&BufferInfo {
                    debug_name: label,
                    byte_size: bytes.len() as u64,
                    kind,
                    usage,
                    initial_data: Some(&bytes),
                })?;
                (buffer, 0, bytes.len() as u64)
            }
            LayoutSource::Buffer { buffer, offset } => {
                self.add_ref(buffer)?;
                let size = self.objects.get(buffer)?.byte_size();
                (buffer, offset, size - offset)
            }
        };

        Ok(ResolvedLayout {
            attributes: layout.attributes,
            buffer,
            offset,
            elements: (bytes / stride) as u32,
        })
    }
}
