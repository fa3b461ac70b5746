use std::collections::HashMap;
use std::thread::ThreadId;

use log::{debug, info};

use crate::gpu::config::DeviceInfo;
use crate::gpu::driver::command::{CommandAvailability, Op};
use crate::gpu::driver::native::{native, Driver};
use crate::gpu::driver::state::{BindCategory, ExecutionContext, RenderPass};
use crate::gpu::driver::types::{NativeCall, NativeObject};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::object::{AnyHandle, GraphicsObject, GraphicsResource, ObjectKind, Registry};
use crate::gpu::resources::surface::attachment_objects;
use crate::gpu::resources::Surface;
use crate::utils::{Handle, Pool};

/// Owns every resource and execution context, and the driver they live on.
///
/// All mutation goes through `&mut Device`, which is what serialises
/// reference counting and context bookkeeping.
pub struct Device<D: Driver> {
    info: DeviceInfo,
    pub(crate) driver: D,
    pub(crate) objects: Registry,
    pub(crate) contexts: Pool<ExecutionContext>,
    thread_contexts: HashMap<ThreadId, Handle<ExecutionContext>>,
    pub(crate) backbuffer: [u32; 2],
}

impl<D: Driver> Device<D> {
    pub fn new(info: DeviceInfo, driver: D) -> Self {
        let info = info.with_env_overrides();
        info!(
            "creating device '{}' on the {} driver, backbuffer {:?}",
            info.debug_name,
            driver.name(),
            info.backbuffer_size
        );

        Self {
            objects: Registry::new(info.initial_pool_capacity),
            contexts: Pool::new(4),
            thread_contexts: HashMap::new(),
            backbuffer: info.backbuffer_size,
            driver,
            info,
        }
    }

    #[inline]
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    #[inline]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[inline]
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    #[inline]
    pub fn backbuffer_size(&self) -> [u32; 2] {
        self.backbuffer
    }

    /// Whether the active driver can execute `op`.
    pub fn query_command_availability(&self, op: Op) -> CommandAvailability {
        if self.driver.techniques().contains(op.techniques()) {
            CommandAvailability::Supported
        } else {
            CommandAvailability::Unsupported
        }
    }

    //===------------------------------------------------------------------===//
    // Objects
    //===------------------------------------------------------------------===//

    pub(crate) fn register<T: GraphicsResource>(&mut self, name: &str, inner: T) -> Result<Handle<T>> {
        let handle = self.objects.insert(name, inner)?;
        debug!("created {} '{}' {:?}", T::NAME, name, handle);
        self.on_add_or_erase(T::erase(handle));
        Ok(handle)
    }

    pub fn get<T: GraphicsResource>(&self, handle: Handle<T>) -> Result<&GraphicsObject<T>> {
        self.objects.get(handle)
    }

    pub fn name<T: GraphicsResource>(&self, handle: Handle<T>) -> Result<&str> {
        Ok(self.objects.get(handle)?.name())
    }

    pub fn ref_count<T: GraphicsResource>(&self, handle: Handle<T>) -> Result<u32> {
        Ok(self.objects.get(handle)?.ref_count())
    }

    pub fn is_alive<T: GraphicsResource>(&self, handle: Handle<T>) -> bool {
        self.objects.get(handle).is_ok()
    }

    /// Live objects of one kind.
    pub fn live_objects(&self, kind: ObjectKind) -> usize {
        self.objects.live(kind)
    }

    pub fn add_ref<T: GraphicsResource>(&mut self, handle: Handle<T>) -> Result<()> {
        self.objects.get_mut(handle)?.add_ref();
        Ok(())
    }

    /// Releases one reference, destroying the object when none remain.
    /// Returns the remaining count.
    pub fn lose_ref<T: GraphicsResource>(&mut self, handle: Handle<T>) -> Result<u32> {
        let obj = self.objects.get_mut(handle)?;
        if obj.ref_count() == 0 {
            return Err(GPUError::RefCountUnderflow(T::NAME));
        }
        let remaining = obj.lose_ref();
        if remaining == 0 {
            self.destroy_object(T::erase(handle))?;
        }
        Ok(remaining)
    }

    /// Drops the caller's reference. Alias of [`Device::lose_ref`] that
    /// reads better at call sites which own the object.
    pub fn destroy<T: GraphicsResource>(&mut self, handle: Handle<T>) -> Result<()> {
        self.lose_ref(handle).map(|_| ())
    }

    pub(crate) fn add_ref_any(&mut self, handle: AnyHandle) -> Result<()> {
        match handle {
            AnyHandle::Buffer(h) => self.add_ref(h),
            AnyHandle::PrimitiveBuffer(h) => self.add_ref(h),
            AnyHandle::Texture(h) => self.add_ref(h),
            AnyHandle::Sampler(h) => self.add_ref(h),
            AnyHandle::Pipeline(h) => self.add_ref(h),
            AnyHandle::Descriptors(h) => self.add_ref(h),
            AnyHandle::Surface(h) => self.add_ref(h),
            AnyHandle::Query(h) => self.add_ref(h),
        }
    }

    pub(crate) fn lose_ref_any(&mut self, handle: AnyHandle) -> Result<u32> {
        match handle {
            AnyHandle::Buffer(h) => self.lose_ref(h),
            AnyHandle::PrimitiveBuffer(h) => self.lose_ref(h),
            AnyHandle::Texture(h) => self.lose_ref(h),
            AnyHandle::Sampler(h) => self.lose_ref(h),
            AnyHandle::Pipeline(h) => self.lose_ref(h),
            AnyHandle::Descriptors(h) => self.lose_ref(h),
            AnyHandle::Surface(h) => self.lose_ref(h),
            AnyHandle::Query(h) => self.lose_ref(h),
        }
    }

    /// Removes an object whose count reached zero, releasing whatever it
    /// referenced and its native objects.
    fn destroy_object(&mut self, handle: AnyHandle) -> Result<()> {
        match handle {
            AnyHandle::Buffer(h) => {
                let b = self.release(h)?;
                self.forget_native(
                    &[BindCategory::UniformBuffer, BindCategory::StorageBuffer],
                    b.native,
                );
                self.driver.destroy(NativeObject::Buffer(b.native));
            }
            AnyHandle::PrimitiveBuffer(h) => {
                let p = self.release(h)?;
                for b in p.buffers() {
                    self.lose_ref(b)?;
                }
            }
            AnyHandle::Texture(h) => {
                let t = self.release(h)?;
                self.driver.destroy(NativeObject::Texture(t.native));
            }
            AnyHandle::Sampler(h) => {
                let s = self.release(h)?;
                self.forget_native(&[BindCategory::Sampler], s.native);
                self.driver.destroy(NativeObject::Sampler(s.native));
            }
            AnyHandle::Pipeline(h) => {
                let p = self.release(h)?;
                if let Some(program) = p.program {
                    self.forget_native(&[BindCategory::Program], program);
                    self.driver.destroy(NativeObject::Program(program));
                }
                if let Some(parent) = p.info().parent {
                    self.lose_ref(parent)?;
                }
            }
            AnyHandle::Descriptors(h) => {
                let d = self.release(h)?;
                let refs: Vec<_> = d.references().collect();
                for r in refs {
                    self.lose_ref_any(r)?;
                }
            }
            AnyHandle::Surface(h) => {
                let s = self.release(h)?;
                if let Some(fb) = &s.attachments {
                    for obj in attachment_objects(fb) {
                        self.driver.destroy(obj);
                    }
                    self.forget_framebuffer(fb.framebuffer);
                }
            }
            AnyHandle::Query(h) => {
                let mut active = false;
                self.contexts.for_each_occupied(|ctx| {
                    active |= ctx.active_query == Some(h);
                });
                let q = self.release(h)?;
                if active {
                    let target = native(&self.driver, q.kind())?;
                    self.driver.issue(NativeCall::EndQuery { target });
                }
                self.driver.destroy(NativeObject::Query(q.native));
            }
        }
        Ok(())
    }

    fn release<T: GraphicsResource>(&mut self, handle: Handle<T>) -> Result<T> {
        let obj = T::pool_mut(&mut self.objects)
            .release(handle.cast())
            .ok_or(GPUError::StaleHandle(T::NAME))?;
        debug!("destroyed {} '{}' {:?}", T::NAME, obj.name(), handle);
        self.on_add_or_erase(T::erase(handle));
        Ok(obj.into_inner())
    }

    /// Registry notification for every construction and destruction. Slots
    /// are reused, so both events clear whatever contexts cached for the
    /// handle.
    fn on_add_or_erase(&mut self, handle: AnyHandle) {
        self.contexts.for_each_occupied_mut(|ctx| ctx.forget_object(handle));
    }

    fn forget_native(&mut self, categories: &[BindCategory], native: u32) {
        self.contexts
            .for_each_occupied_mut(|ctx| ctx.forget_native(categories, native));
    }

    pub(crate) fn forget_framebuffer(&mut self, framebuffer: u32) {
        self.forget_native(
            &[BindCategory::DrawFramebuffer, BindCategory::ReadFramebuffer],
            framebuffer,
        );
    }

    /// Whether any context is inside a render pass targeting `surface`.
    pub(crate) fn is_render_target(&self, surface: Handle<Surface>) -> bool {
        let mut active = false;
        self.contexts.for_each_occupied(|ctx| {
            active |= ctx.render_pass() == RenderPass::Active(surface);
        });
        active
    }

    //===------------------------------------------------------------------===//
    // Contexts
    //===------------------------------------------------------------------===//

    /// Context of the calling thread, created on first use.
    pub fn current_context(&mut self) -> Result<Handle<ExecutionContext>> {
        let id = std::thread::current().id();
        if let Some(h) = self.thread_contexts.get(&id) {
            if self.contexts.get_ref(*h).is_some() {
                return Ok(*h);
            }
        }

        let h = self
            .contexts
            .insert(ExecutionContext::new(id))
            .ok_or(GPUError::SlotError)?;
        self.thread_contexts.insert(id, h);
        info!("created execution context {:?} for thread {:?}", h, id);
        Ok(h)
    }

    pub fn context(&self, handle: Handle<ExecutionContext>) -> Result<&ExecutionContext> {
        self.contexts
            .get_ref(handle)
            .ok_or(GPUError::StaleHandle("execution context"))
    }

    /// Tears a context down, deleting every derived object it owns.
    pub fn destroy_context(&mut self, handle: Handle<ExecutionContext>) -> Result<()> {
        self.context(handle)?.check_thread()?;
        let mut ctx = self
            .contexts
            .release(handle)
            .ok_or(GPUError::StaleHandle("execution context"))?;

        let derived = ctx.take_derived();
        info!(
            "destroying execution context {:?}, {} derived objects",
            handle,
            derived.len()
        );
        for obj in derived {
            self.driver.destroy(obj);
        }
        self.thread_contexts.retain(|_, h| *h != handle);
        Ok(())
    }
}

impl<D: Driver> Drop for Device<D> {
    fn drop(&mut self) {
        let mut derived = Vec::new();
        self.contexts
            .for_each_occupied_mut(|ctx| derived.extend(ctx.take_derived()));
        for obj in derived {
            self.driver.destroy(obj);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::driver::null::NullDriver;
    use crate::gpu::resources::BufferInfo;
    use crate::gpu::structs::{BufferKind, Techniques};

    fn device() -> Device<NullDriver> {
        Device::new(DeviceInfo::default(), NullDriver::new())
    }

    #[test]
    fn availability_follows_techniques() {
        let dev = device();
        assert_eq!(
            dev.query_command_availability(Op::DrawInstanced),
            CommandAvailability::Supported
        );
        assert_eq!(
            dev.query_command_availability(Op::TraceRays),
            CommandAvailability::Unsupported
        );

        let rt = Device::new(
            DeviceInfo::default(),
            NullDriver::new().with_techniques(Techniques::RAYTRACING),
        );
        assert_eq!(
            rt.query_command_availability(Op::TraceRays),
            CommandAvailability::Supported
        );
    }

    #[test]
    fn refcount_destroys_at_zero() {
        let mut dev = device();
        let b = dev
            .make_buffer(&BufferInfo {
                debug_name: "ubo",
                byte_size: 64,
                kind: BufferKind::Uniform,
                ..Default::default()
            })
            .unwrap();
        dev.add_ref(b).unwrap();
        assert_eq!(dev.lose_ref(b).unwrap(), 1);
        assert!(dev.is_alive(b));
        assert_eq!(dev.lose_ref(b).unwrap(), 0);
        assert!(!dev.is_alive(b));
        assert!(matches!(dev.lose_ref(b), Err(GPUError::StaleHandle(_))));
        assert_eq!(dev.live_objects(ObjectKind::Buffer), 0);
    }

    #[test]
    fn one_context_per_thread() {
        let mut dev = device();
        let a = dev.current_context().unwrap();
        let b = dev.current_context().unwrap();
        assert_eq!(a, b);
        dev.destroy_context(a).unwrap();
        assert!(dev.context(a).is_err());
        let c = dev.current_context().unwrap();
        assert_ne!(a, c);
    }
}
