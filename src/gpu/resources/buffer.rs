use crate::gpu::device::Device;
use crate::gpu::driver::native::{native, Driver};
use crate::gpu::driver::types::{NativeBufferDesc, NativeHandle, NativeObject};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::structs::{BufferKind, GPUFormat, MemoryUsage};
use crate::utils::Handle;

#[cfg(feature = "tessera-serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct BufferInfo<'a> {
    pub debug_name: &'a str,
    pub byte_size: u64,
    pub kind: BufferKind,
    pub usage: MemoryUsage,
    pub initial_data: Option<&'a [u8]>,
}

impl<'a> Default for BufferInfo<'a> {
    fn default() -> Self {
        Self {
            debug_name: "",
            byte_size: 1024,
            kind: BufferKind::Uniform,
            usage: MemoryUsage::empty(),
            initial_data: None,
        }
    }
}

/// Raw device memory.
#[derive(Debug)]
pub struct GPUBuffer {
    kind: BufferKind,
    usage: MemoryUsage,
    byte_size: u64,
    pub(crate) native: NativeHandle,
}

impl GPUBuffer {
    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    #[inline]
    pub fn usage(&self) -> MemoryUsage {
        self.usage
    }

    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.native
    }
}

impl<D: Driver> Device<D> {
    pub fn make_buffer(&mut self, info: &BufferInfo) -> Result<Handle<GPUBuffer>> {
        if info.byte_size == 0 {
            return Err(GPUError::invalid(format!(
                "buffer '{}' has zero size",
                info.debug_name
            )));
        }
        if let Some(data) = info.initial_data {
            if data.len() as u64 > info.byte_size {
                return Err(GPUError::invalid(format!(
                    "buffer '{}' initial data ({} bytes) exceeds its size ({})",
                    info.debug_name,
                    data.len(),
                    info.byte_size
                )));
            }
        }

        let target = native(&self.driver, info.kind)?;
        let handle = self.driver.create_buffer(&NativeBufferDesc {
            label: info.debug_name,
            target,
            size: info.byte_size,
            usage: info.usage,
            data: info.initial_data,
        });

        let registered = self.register(
            info.debug_name,
            GPUBuffer {
                kind: info.kind,
                usage: info.usage,
                byte_size: info.byte_size,
                native: handle,
            },
        );
        if registered.is_err() {
            self.driver.destroy(NativeObject::Buffer(handle));
        }
        registered
    }

    /// Overwrites part of a CPU writable buffer.
    pub fn write_buffer(&mut self, buffer: Handle<GPUBuffer>, offset: u64, data: &[u8]) -> Result<()> {
        let b = self.objects.get(buffer)?;
        if !b.usage.contains(MemoryUsage::CPU_WRITE) {
            return Err(GPUError::invalid(format!(
                "buffer '{}' is not CPU writable",
                b.name()
            )));
        }
        let end = offset
            .checked_add(data.len() as u64)
            .filter(|end| *end <= b.byte_size);
        if end.is_none() {
            return Err(GPUError::invalid(format!(
                "write of {} bytes at {} overflows buffer '{}' ({} bytes)",
                data.len(),
                offset,
                b.name(),
                b.byte_size
            )));
        }

        let native = b.native;
        self.driver.write_buffer(native, offset, data);
        Ok(())
    }
}

//===----------------------------------------------------------------------===//
// Vertex layouts
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct BufferAttribute {
    pub location: u32,
    pub format: GPUFormat,
    pub offset: u32,
}

/// Interleaved vertex format of one buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct BufferAttributes {
    attributes: Vec<BufferAttribute>,
    stride: u32,
    instanced: bool,
}

impl BufferAttributes {
    /// Tightly packs `formats` at consecutive locations starting at
    /// `first_location`.
    pub fn new(first_location: u32, formats: &[GPUFormat], instanced: bool) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .enumerate()
            .map(|(i, format)| {
                let a = BufferAttribute {
                    location: first_location + i as u32,
                    format: *format,
                    offset,
                };
                offset += format.stride();
                a
            })
            .collect();

        Self {
            attributes,
            stride: offset,
            instanced,
        }
    }

    /// Explicit offsets and stride, for padded or aliased layouts.
    pub fn with_stride(attributes: Vec<BufferAttribute>, stride: u32, instanced: bool) -> Self {
        Self {
            attributes,
            stride,
            instanced,
        }
    }

    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    #[inline]
    pub fn is_instanced(&self) -> bool {
        self.instanced
    }

    #[inline]
    pub fn attributes(&self) -> &[BufferAttribute] {
        &self.attributes
    }

    pub fn formats(&self) -> impl Iterator<Item = GPUFormat> + '_ {
        self.attributes.iter().map(|a| a.format)
    }

    /// Equal when both describe the same formats in the same order.
    pub fn same_formats(&self, other: &BufferAttributes) -> bool {
        self.attributes.len() == other.attributes.len() && self.formats().eq(other.formats())
    }
}

/// Where the data described by a [`BufferAttributes`] lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSource {
    /// Allocate a buffer holding these bytes.
    Data { bytes: Vec<u8>, usage: MemoryUsage },
    /// Read from an existing buffer starting at `offset`.
    Buffer {
        buffer: Handle<GPUBuffer>,
        offset: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferLayout {
    pub attributes: BufferAttributes,
    pub source: LayoutSource,
}

impl BufferLayout {
    pub fn from_data(bytes: Vec<u8>, attributes: BufferAttributes) -> Self {
        Self {
            attributes,
            source: LayoutSource::Data {
                bytes,
                usage: MemoryUsage::empty(),
            },
        }
    }

    pub fn from_data_with_usage(bytes: Vec<u8>, attributes: BufferAttributes, usage: MemoryUsage) -> Self {
        Self {
            attributes,
            source: LayoutSource::Data { bytes, usage },
        }
    }

    pub fn from_buffer(buffer: Handle<GPUBuffer>, attributes: BufferAttributes, offset: u64) -> Self {
        Self {
            attributes,
            source: LayoutSource::Buffer { buffer, offset },
        }
    }
}

/// A [`BufferLayout`] after its buffer has been allocated or adopted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub attributes: BufferAttributes,
    pub buffer: Handle<GPUBuffer>,
    pub offset: u64,
    pub elements: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_attributes() {
        let attrs = BufferAttributes::new(
            2,
            &[GPUFormat::RGB32f, GPUFormat::RG16f, GPUFormat::RGBA8],
            false,
        );
        assert_eq!(attrs.stride(), 12 + 4 + 4);
        let offsets: Vec<_> = attrs.attributes().iter().map(|a| (a.location, a.offset)).collect();
        assert_eq!(offsets, vec![(2, 0), (3, 12), (4, 16)]);
    }

    #[test]
    fn format_comparison_ignores_locations() {
        let a = BufferAttributes::new(0, &[GPUFormat::RGB32f, GPUFormat::RG32f], false);
        let b = BufferAttributes::new(4, &[GPUFormat::RGB32f, GPUFormat::RG32f], true);
        let c = BufferAttributes::new(0, &[GPUFormat::RGB32f], false);
        assert!(a.same_formats(&b));
        assert!(!a.same_formats(&c));
    }
}
