use super::types::*;
use crate::gpu::error::{GPUError, Result};
use crate::gpu::structs::Techniques;

/// The seam between the engine and a native graphics API.
///
/// A driver is driven from a single thread at a time. Object creation
/// returns opaque native names; everything else is a [`NativeCall`].
pub trait Driver {
    fn name(&self) -> &str;

    /// Optional feature sets this backend implements.
    fn techniques(&self) -> Techniques;

    fn max_samples(&self) -> u32;

    /// Maps a backend-neutral value to a driver constant, or `None` when the
    /// backend has no equivalent.
    fn translate(&self, value: Abstract) -> Option<NativeEnum>;

    fn create_buffer(&mut self, desc: &NativeBufferDesc<'_>) -> NativeHandle;
    fn write_buffer(&mut self, buffer: NativeHandle, offset: u64, data: &[u8]);
    fn create_texture(&mut self, desc: &NativeTextureDesc<'_>) -> NativeHandle;
    fn create_sampler(&mut self, desc: &NativeSamplerDesc<'_>) -> NativeHandle;
    fn create_query(&mut self, label: &str, target: NativeEnum) -> NativeHandle;

    /// Latest available result of a finished query.
    fn query_result(&mut self, query: NativeHandle) -> Option<u64>;

    /// Links the given stages. The error string is the driver's log.
    fn create_program(&mut self, desc: &NativeProgramDesc<'_>) -> Result<NativeHandle, String>;

    fn create_texture_view(&mut self, desc: &NativeViewDesc<'_>) -> NativeHandle;
    fn create_vertex_array(&mut self, desc: &NativeVertexArrayDesc<'_>) -> NativeHandle;

    /// Allocates all attachments. The error string describes why the result
    /// was incomplete; nothing is left allocated in that case.
    fn create_framebuffer(
        &mut self,
        desc: &NativeFramebufferDesc<'_>,
    ) -> Result<NativeFramebuffer, String>;

    fn destroy(&mut self, object: NativeObject);

    fn issue(&mut self, call: NativeCall);

    /// Shows the backbuffer.
    fn present(&mut self);
}

/// Translates `value`, turning a missing mapping into [`GPUError::Unmapped`].
#[inline]
pub fn native<D: Driver + ?Sized>(driver: &D, value: impl Into<Abstract>) -> Result<NativeEnum> {
    let value = value.into();
    driver.translate(value).ok_or(GPUError::Unmapped(value))
}
