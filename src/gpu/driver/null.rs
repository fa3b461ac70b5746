use std::collections::HashMap;

use super::gl;
use super::native::Driver;
use super::types::*;
use crate::gpu::structs::{ShaderStage, Techniques};

/// Stages with no core GL enum get `EXTENSION_STAGE | stage` when the
/// matching technique is enabled.
pub const EXTENSION_STAGE: NativeEnum = 0x1000_0000;

/// Headless driver that records everything it is asked to do.
///
/// Translation uses the OpenGL table so recorded enums are realistic. Tests
/// inspect [`NullDriver::calls`] to verify state deduplication.
pub struct NullDriver {
    next: NativeHandle,
    calls: Vec<NativeCall>,
    created: Vec<NativeObject>,
    destroyed: Vec<NativeObject>,
    buffers: HashMap<NativeHandle, Vec<u8>>,
    query_results: HashMap<NativeHandle, u64>,
    techniques: Techniques,
    max_samples: u32,
    presents: u64,
    /// When set, framebuffer creation reports incompleteness.
    pub fail_framebuffers: bool,
    /// When set, program creation fails with this log.
    pub program_error: Option<String>,
}

impl Default for NullDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl NullDriver {
    pub fn new() -> Self {
        Self {
            next: 0,
            calls: Vec::new(),
            created: Vec::new(),
            destroyed: Vec::new(),
            buffers: HashMap::new(),
            query_results: HashMap::new(),
            techniques: Techniques::empty(),
            max_samples: 8,
            presents: 0,
            fail_framebuffers: false,
            program_error: None,
        }
    }

    pub fn with_techniques(mut self, techniques: Techniques) -> Self {
        self.techniques = techniques;
        self
    }

    pub fn with_max_samples(mut self, max_samples: u32) -> Self {
        self.max_samples = max_samples;
        self
    }

    #[inline]
    pub fn calls(&self) -> &[NativeCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<NativeCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&NativeCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    #[inline]
    pub fn created(&self) -> &[NativeObject] {
        &self.created
    }

    #[inline]
    pub fn destroyed(&self) -> &[NativeObject] {
        &self.destroyed
    }

    pub fn is_destroyed(&self, object: NativeObject) -> bool {
        self.destroyed.contains(&object)
    }

    /// Current contents of a buffer created through this driver.
    pub fn buffer_contents(&self, buffer: NativeHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn set_query_result(&mut self, query: NativeHandle, value: u64) {
        self.query_results.insert(query, value);
    }

    #[inline]
    pub fn presents(&self) -> u64 {
        self.presents
    }

    fn alloc(&mut self) -> NativeHandle {
        self.next += 1;
        self.next
    }
}

impl Driver for NullDriver {
    fn name(&self) -> &str {
        "null"
    }

    fn techniques(&self) -> Techniques {
        self.techniques
    }

    fn max_samples(&self) -> u32 {
        self.max_samples
    }

    fn translate(&self, value: Abstract) -> Option<NativeEnum> {
        match value {
            Abstract::ShaderStage(s) if s.is_raytracing() => self
                .techniques
                .contains(Techniques::RAYTRACING)
                .then_some(EXTENSION_STAGE | s as u32),
            Abstract::ShaderStage(s @ (ShaderStage::Task | ShaderStage::Mesh)) => self
                .techniques
                .contains(Techniques::MESH_SHADING)
                .then_some(EXTENSION_STAGE | s as u32),
            _ => gl::translate(value),
        }
    }

    fn create_buffer(&mut self, desc: &NativeBufferDesc<'_>) -> NativeHandle {
        let h = self.alloc();
        let mut contents = vec![0u8; desc.size as usize];
        if let Some(data) = desc.data {
            let n = data.len().min(contents.len());
            contents[..n].copy_from_slice(&data[..n]);
        }
        self.buffers.insert(h, contents);
        self.created.push(NativeObject::Buffer(h));
        h
    }

    fn write_buffer(&mut self, buffer: NativeHandle, offset: u64, data: &[u8]) {
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            let start = offset as usize;
            let end = start.saturating_add(data.len()).min(contents.len());
            if start < end {
                contents[start..end].copy_from_slice(&data[..end - start]);
            }
        }
    }

    fn create_texture(&mut self, _desc: &NativeTextureDesc<'_>) -> NativeHandle {
        let h = self.alloc();
        self.created.push(NativeObject::Texture(h));
        h
    }

    fn create_sampler(&mut self, _desc: &NativeSamplerDesc<'_>) -> NativeHandle {
        let h = self.alloc();
        self.created.push(NativeObject::Sampler(h));
        h
    }

    fn create_query(&mut self, _label: &str, _target: NativeEnum) -> NativeHandle {
        let h = self.alloc();
        self.created.push(NativeObject::Query(h));
        h
    }

    fn query_result(&mut self, query: NativeHandle) -> Option<u64> {
        self.query_results.get(&query).copied()
    }

    fn create_program(&mut self, desc: &NativeProgramDesc<'_>) -> Result<NativeHandle, String> {
        if let Some(log) = &self.program_error {
            return Err(format!("{}: {}", desc.label, log));
        }
        let h = self.alloc();
        self.created.push(NativeObject::Program(h));
        Ok(h)
    }

    fn create_texture_view(&mut self, _desc: &NativeViewDesc<'_>) -> NativeHandle {
        let h = self.alloc();
        self.created.push(NativeObject::TextureView(h));
        h
    }

    fn create_vertex_array(&mut self, _desc: &NativeVertexArrayDesc<'_>) -> NativeHandle {
        let h = self.alloc();
        self.created.push(NativeObject::VertexArray(h));
        h
    }

    fn create_framebuffer(
        &mut self,
        desc: &NativeFramebufferDesc<'_>,
    ) -> Result<NativeFramebuffer, String> {
        if self.fail_framebuffers {
            return Err(format!("{}: incomplete attachment", desc.label));
        }

        let framebuffer = self.alloc();
        self.created.push(NativeObject::Framebuffer(framebuffer));

        let mut colors = Vec::with_capacity(desc.colors.len());
        for _ in &desc.colors {
            let h = self.alloc();
            self.created.push(NativeObject::Texture(h));
            colors.push(h);
        }

        let depth = desc.depth.map(|d| {
            let h = self.alloc();
            let obj = if d.as_texture {
                NativeObject::Texture(h)
            } else {
                NativeObject::Renderbuffer(h)
            };
            self.created.push(obj);
            obj
        });

        Ok(NativeFramebuffer {
            framebuffer,
            colors,
            depth,
        })
    }

    fn destroy(&mut self, object: NativeObject) {
        if let NativeObject::Buffer(h) = object {
            self.buffers.remove(&h);
        }
        self.destroyed.push(object);
    }

    fn issue(&mut self, call: NativeCall) {
        self.calls.push(call);
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}
