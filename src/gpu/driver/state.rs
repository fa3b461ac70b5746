use std::collections::HashMap;
use std::thread::ThreadId;

use log::trace;

use super::command::ClearColor;
use super::types::{NativeHandle, NativeObject};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::object::AnyHandle;
use crate::gpu::resources::{Descriptors, Pipeline, PrimitiveBuffer, Query, Surface, Texture, TextureRange};
use crate::gpu::structs::{BlendState, DepthStencil, Rasterizer};
use crate::utils::Handle;

/// Native binding points tracked by the cache.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BindCategory {
    Program,
    VertexArray,
    DrawFramebuffer,
    ReadFramebuffer,
    UniformBuffer,
    StorageBuffer,
    Sampler,
    Texture,
    Image,
}

/// A native object bound at an indexed binding point. Textures and samplers
/// use zero offset and size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BoundRange {
    pub handle: NativeHandle,
    pub offset: u64,
    pub size: u64,
}

impl BoundRange {
    pub fn whole(handle: NativeHandle) -> Self {
        Self {
            handle,
            offset: 0,
            size: 0,
        }
    }
}

/// Fixed function state last pushed to the driver by a pipeline bind.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PipelineState {
    pub rasterizer: Rasterizer,
    pub blend: BlendState,
    pub depth_stencil: DepthStencil,
    pub min_sample_shading: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RenderPass {
    #[default]
    Idle,
    Active(Handle<Surface>),
}

/// Region in resolved pixels.
pub type Region = ([i32; 2], [u32; 2]);

/// Stores `value` in `slot` and reports whether it differed.
#[inline]
pub(crate) fn set_if_changed<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

/// Per-thread device state cache.
///
/// Everything a thread has pushed to the driver is mirrored here so repeat
/// binds can be skipped. Derived objects (vertex arrays, texture views) are
/// owned by the context that created them and deleted at the start of the
/// next execute once their source resource dies.
pub struct ExecutionContext {
    owner: ThreadId,
    frame_id: u64,

    pub(crate) bound: HashMap<BindCategory, NativeHandle>,
    pub(crate) bound_ranges: HashMap<(u32, BindCategory), BoundRange>,
    pub(crate) applied: Option<PipelineState>,

    // Dynamic state.
    pub(crate) viewport: Option<Region>,
    pub(crate) scissor: Option<Region>,
    pub(crate) scissor_enabled: Option<bool>,
    pub(crate) clear_color: ClearColor,
    pub(crate) clear_depth: f32,
    pub(crate) clear_stencil: u32,
    pub(crate) applied_clear_color: Option<ClearColor>,
    pub(crate) applied_clear_depth: Option<f32>,
    pub(crate) applied_clear_stencil: Option<u32>,
    pub(crate) blend_color: Option<[f32; 4]>,
    pub(crate) stencil_compare_mask: Option<u32>,
    pub(crate) stencil_write_mask: Option<u32>,

    // Current objects.
    pub(crate) pipeline: Option<Handle<Pipeline>>,
    pub(crate) descriptors: Option<Handle<Descriptors>>,
    pub(crate) primitive_buffer: Option<Handle<PrimitiveBuffer>>,
    pub(crate) render_pass: RenderPass,
    pub(crate) active_query: Option<Handle<Query>>,
    /// Size of the bound draw framebuffer.
    pub(crate) framebuffer_size: Option<[u32; 2]>,

    // Derived objects.
    pub(crate) vertex_arrays: HashMap<Handle<PrimitiveBuffer>, NativeHandle>,
    pub(crate) texture_views: HashMap<(Handle<Texture>, TextureRange), NativeHandle>,
    deletions: Vec<NativeObject>,
}

impl ExecutionContext {
    pub fn new(owner: ThreadId) -> Self {
        Self {
            owner,
            frame_id: 0,
            bound: HashMap::new(),
            bound_ranges: HashMap::new(),
            applied: None,
            viewport: None,
            scissor: None,
            scissor_enabled: None,
            clear_color: ClearColor::default(),
            clear_depth: 1.0,
            clear_stencil: 0,
            applied_clear_color: None,
            applied_clear_depth: None,
            applied_clear_stencil: None,
            blend_color: None,
            stencil_compare_mask: None,
            stencil_write_mask: None,
            pipeline: None,
            descriptors: None,
            primitive_buffer: None,
            render_pass: RenderPass::Idle,
            active_query: None,
            framebuffer_size: None,
            vertex_arrays: HashMap::new(),
            texture_views: HashMap::new(),
            deletions: Vec::new(),
        }
    }

    #[inline]
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn check_thread(&self) -> Result<()> {
        if std::thread::current().id() != self.owner {
            return Err(GPUError::WrongThread);
        }
        Ok(())
    }

    /// Frames presented through this context.
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame_id += 1;
    }

    #[inline]
    pub fn render_pass(&self) -> RenderPass {
        self.render_pass
    }

    #[inline]
    pub fn pipeline(&self) -> Option<Handle<Pipeline>> {
        self.pipeline
    }

    #[inline]
    pub fn primitive_buffer(&self) -> Option<Handle<PrimitiveBuffer>> {
        self.primitive_buffer
    }

    #[inline]
    pub fn descriptors(&self) -> Option<Handle<Descriptors>> {
        self.descriptors
    }

    pub fn bound(&self, category: BindCategory) -> Option<NativeHandle> {
        self.bound.get(&category).copied()
    }

    pub fn bound_range(&self, slot: u32, category: BindCategory) -> Option<BoundRange> {
        self.bound_ranges.get(&(slot, category)).copied()
    }

    /// Records `handle` as bound to `category`. Returns false when it
    /// already was, in which case no native call is needed.
    pub fn bind(&mut self, category: BindCategory, handle: NativeHandle) -> bool {
        if self.bound.get(&category) == Some(&handle) {
            trace!("skipping {category:?} bind of {handle}");
            return false;
        }
        self.bound.insert(category, handle);
        true
    }

    /// Same as [`ExecutionContext::bind`] for an indexed binding point.
    pub fn bind_range(&mut self, slot: u32, category: BindCategory, range: BoundRange) -> bool {
        let key = (slot, category);
        if self.bound_ranges.get(&key) == Some(&range) {
            trace!("skipping {category:?} bind of {} at slot {slot}", range.handle);
            return false;
        }
        self.bound_ranges.insert(key, range);
        true
    }

    /// Drops every cache entry that points at `handle` in one of
    /// `categories`, so the next bind reissues the native call.
    pub fn forget_native(&mut self, categories: &[BindCategory], handle: NativeHandle) {
        self.bound
            .retain(|c, h| !(*h == handle && categories.contains(c)));
        self.bound_ranges
            .retain(|(_, c), r| !(r.handle == handle && categories.contains(c)));
    }

    /// Invalidates everything that refers to a destroyed object and queues
    /// the derived objects built from it.
    pub(crate) fn forget_object(&mut self, object: AnyHandle) {
        match object {
            AnyHandle::PrimitiveBuffer(h) => {
                if self.primitive_buffer == Some(h) {
                    self.primitive_buffer = None;
                }
                if let Some(vao) = self.vertex_arrays.remove(&h) {
                    self.forget_native(&[BindCategory::VertexArray], vao);
                    self.deletions.push(NativeObject::VertexArray(vao));
                }
            }
            AnyHandle::Texture(h) => {
                let views: Vec<_> = self
                    .texture_views
                    .iter()
                    .filter(|((t, _), _)| *t == h)
                    .map(|(k, v)| (*k, *v))
                    .collect();
                for (key, view) in views {
                    self.texture_views.remove(&key);
                    self.forget_native(&[BindCategory::Texture, BindCategory::Image], view);
                    self.deletions.push(NativeObject::TextureView(view));
                }
            }
            AnyHandle::Pipeline(h) => {
                if self.pipeline == Some(h) {
                    self.pipeline = None;
                }
            }
            AnyHandle::Descriptors(h) => {
                if self.descriptors == Some(h) {
                    self.descriptors = None;
                }
            }
            AnyHandle::Query(h) => {
                if self.active_query == Some(h) {
                    self.active_query = None;
                }
            }
            AnyHandle::Surface(h) => {
                if self.render_pass == RenderPass::Active(h) {
                    self.render_pass = RenderPass::Idle;
                }
            }
            AnyHandle::Buffer(_) | AnyHandle::Sampler(_) => {}
        }
    }

    /// Derived objects waiting for deletion.
    #[inline]
    pub fn pending_deletions(&self) -> usize {
        self.deletions.len()
    }

    pub(crate) fn drain_deletions(&mut self) -> Vec<NativeObject> {
        std::mem::take(&mut self.deletions)
    }

    /// Every derived object this context owns, for teardown.
    pub(crate) fn take_derived(&mut self) -> Vec<NativeObject> {
        let mut all = self.drain_deletions();
        all.extend(self.vertex_arrays.drain().map(|(_, v)| NativeObject::VertexArray(v)));
        all.extend(self.texture_views.drain().map(|(_, v)| NativeObject::TextureView(v)));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(std::thread::current().id())
    }

    #[test]
    fn bind_dedup() {
        let mut c = ctx();
        assert!(c.bind(BindCategory::Program, 3));
        assert!(!c.bind(BindCategory::Program, 3));
        assert!(c.bind(BindCategory::Program, 4));
        assert!(c.bind(BindCategory::VertexArray, 4));
    }

    #[test]
    fn range_dedup_keys_on_slot_and_range() {
        let mut c = ctx();
        let r = BoundRange {
            handle: 7,
            offset: 0,
            size: 256,
        };
        assert!(c.bind_range(0, BindCategory::UniformBuffer, r));
        assert!(!c.bind_range(0, BindCategory::UniformBuffer, r));
        assert!(c.bind_range(1, BindCategory::UniformBuffer, r));
        assert!(c.bind_range(0, BindCategory::StorageBuffer, r));
        assert!(c.bind_range(0, BindCategory::UniformBuffer, BoundRange { offset: 256, ..r }));
    }

    #[test]
    fn forgetting_a_handle_forces_a_rebind() {
        let mut c = ctx();
        c.bind(BindCategory::DrawFramebuffer, 9);
        c.bind_range(2, BindCategory::Texture, BoundRange::whole(9));
        c.forget_native(&[BindCategory::DrawFramebuffer], 9);
        assert_eq!(c.bound(BindCategory::DrawFramebuffer), None);
        assert!(c.bound_range(2, BindCategory::Texture).is_some());
    }

    #[test]
    fn destroyed_primitive_buffer_queues_its_vertex_array() {
        let mut c = ctx();
        let h = Handle::<PrimitiveBuffer>::new(0, 1);
        c.vertex_arrays.insert(h, 12);
        c.primitive_buffer = Some(h);
        c.bind(BindCategory::VertexArray, 12);

        c.forget_object(AnyHandle::PrimitiveBuffer(h));
        assert_eq!(c.primitive_buffer(), None);
        assert_eq!(c.bound(BindCategory::VertexArray), None);
        assert_eq!(c.drain_deletions(), vec![NativeObject::VertexArray(12)]);
        assert_eq!(c.pending_deletions(), 0);
    }

    #[test]
    fn destroyed_texture_queues_every_view() {
        let mut c = ctx();
        let t = Handle::<Texture>::new(1, 1);
        let other = Handle::<Texture>::new(2, 1);
        c.texture_views.insert((t, TextureRange::levels(0, 1)), 20);
        c.texture_views.insert((t, TextureRange::levels(1, 1)), 21);
        c.texture_views.insert((other, TextureRange::default()), 22);

        c.forget_object(AnyHandle::Texture(t));
        let mut deleted = c.drain_deletions();
        deleted.sort_by_key(|o| match o {
            NativeObject::TextureView(h) => *h,
            _ => 0,
        });
        assert_eq!(
            deleted,
            vec![NativeObject::TextureView(20), NativeObject::TextureView(21)]
        );
        assert_eq!(c.texture_views.len(), 1);
    }

    #[test]
    fn wrong_thread_is_reported() {
        let c = ctx();
        let r = std::thread::spawn(move || c.check_thread().is_err())
            .join()
            .unwrap();
        assert!(r);
    }
}
