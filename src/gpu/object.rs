use std::ops::{Deref, DerefMut};

use crate::gpu::resources::*;
use crate::utils::{Handle, Pool};

/// A named, reference counted resource stored in a [`Registry`].
///
/// Objects are never copied; other objects hold a [`Handle`] plus one
/// reference instead.
#[derive(Debug)]
pub struct GraphicsObject<T> {
    name: String,
    refs: u32,
    inner: T,
}

impl<T> GraphicsObject<T> {
    pub(crate) fn new(name: &str, inner: T) -> Self {
        Self {
            name: name.to_string(),
            refs: 1,
            inner,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ref_count(&self) -> u32 {
        self.refs
    }

    pub(crate) fn add_ref(&mut self) {
        self.refs += 1;
    }

    /// Returns the remaining count.
    pub(crate) fn lose_ref(&mut self) -> u32 {
        self.refs -= 1;
        self.refs
    }

    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for GraphicsObject<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for GraphicsObject<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    PrimitiveBuffer,
    Texture,
    Sampler,
    Pipeline,
    Descriptors,
    Surface,
    Query,
}

/// Type-erased handle used for registry notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyHandle {
    Buffer(Handle<GPUBuffer>),
    PrimitiveBuffer(Handle<PrimitiveBuffer>),
    Texture(Handle<Texture>),
    Sampler(Handle<Sampler>),
    Pipeline(Handle<Pipeline>),
    Descriptors(Handle<Descriptors>),
    Surface(Handle<Surface>),
    Query(Handle<Query>),
}

impl AnyHandle {
    pub fn kind(&self) -> ObjectKind {
        match self {
            AnyHandle::Buffer(_) => ObjectKind::Buffer,
            AnyHandle::PrimitiveBuffer(_) => ObjectKind::PrimitiveBuffer,
            AnyHandle::Texture(_) => ObjectKind::Texture,
            AnyHandle::Sampler(_) => ObjectKind::Sampler,
            AnyHandle::Pipeline(_) => ObjectKind::Pipeline,
            AnyHandle::Descriptors(_) => ObjectKind::Descriptors,
            AnyHandle::Surface(_) => ObjectKind::Surface,
            AnyHandle::Query(_) => ObjectKind::Query,
        }
    }
}

/// One pool per resource kind.
#[derive(Default)]
pub struct Registry {
    pub(crate) buffers: Pool<GraphicsObject<GPUBuffer>>,
    pub(crate) primitive_buffers: Pool<GraphicsObject<PrimitiveBuffer>>,
    pub(crate) textures: Pool<GraphicsObject<Texture>>,
    pub(crate) samplers: Pool<GraphicsObject<Sampler>>,
    pub(crate) pipelines: Pool<GraphicsObject<Pipeline>>,
    pub(crate) descriptors: Pool<GraphicsObject<Descriptors>>,
    pub(crate) surfaces: Pool<GraphicsObject<Surface>>,
    pub(crate) queries: Pool<GraphicsObject<Query>>,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Pool::new(capacity),
            primitive_buffers: Pool::new(capacity),
            textures: Pool::new(capacity),
            samplers: Pool::new(capacity),
            pipelines: Pool::new(capacity),
            descriptors: Pool::new(capacity),
            surfaces: Pool::new(capacity),
            queries: Pool::new(capacity),
        }
    }

    pub fn live(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Buffer => self.buffers.len(),
            ObjectKind::PrimitiveBuffer => self.primitive_buffers.len(),
            ObjectKind::Texture => self.textures.len(),
            ObjectKind::Sampler => self.samplers.len(),
            ObjectKind::Pipeline => self.pipelines.len(),
            ObjectKind::Descriptors => self.descriptors.len(),
            ObjectKind::Surface => self.surfaces.len(),
            ObjectKind::Query => self.queries.len(),
        }
    }
}

/// Implemented by every resource type stored in a [`Registry`].
pub trait GraphicsResource: Sized + 'static {
    const KIND: ObjectKind;
    const NAME: &'static str;

    fn pool(registry: &Registry) -> &Pool<GraphicsObject<Self>>;
    fn pool_mut(registry: &mut Registry) -> &mut Pool<GraphicsObject<Self>>;
    fn erase(handle: Handle<Self>) -> AnyHandle;
}

macro_rules! resource {
    ($($ty:ident => $field:ident, $variant:ident, $name:literal);* $(;)?) => {
        $(impl GraphicsResource for $ty {
            const KIND: ObjectKind = ObjectKind::$variant;
            const NAME: &'static str = $name;

            #[inline]
            fn pool(registry: &Registry) -> &Pool<GraphicsObject<Self>> {
                &registry.$field
            }

            #[inline]
            fn pool_mut(registry: &mut Registry) -> &mut Pool<GraphicsObject<Self>> {
                &mut registry.$field
            }

            #[inline]
            fn erase(handle: Handle<Self>) -> AnyHandle {
                AnyHandle::$variant(handle)
            }
        })*
    };
}

resource! {
    GPUBuffer => buffers, Buffer, "buffer";
    PrimitiveBuffer => primitive_buffers, PrimitiveBuffer, "primitive buffer";
    Texture => textures, Texture, "texture";
    Sampler => samplers, Sampler, "sampler";
    Pipeline => pipelines, Pipeline, "pipeline";
    Descriptors => descriptors, Descriptors, "descriptors";
    Surface => surfaces, Surface, "surface";
    Query => queries, Query, "query";
}

impl Registry {
    pub fn get<T: GraphicsResource>(&self, handle: Handle<T>) -> crate::Result<&GraphicsObject<T>> {
        T::pool(self)
            .get_ref(handle.cast())
            .ok_or(crate::GPUError::StaleHandle(T::NAME))
    }

    pub fn get_mut<T: GraphicsResource>(
        &mut self,
        handle: Handle<T>,
    ) -> crate::Result<&mut GraphicsObject<T>> {
        T::pool_mut(self)
            .get_mut_ref(handle.cast())
            .ok_or(crate::GPUError::StaleHandle(T::NAME))
    }

    pub(crate) fn insert<T: GraphicsResource>(
        &mut self,
        name: &str,
        inner: T,
    ) -> crate::Result<Handle<T>> {
        T::pool_mut(self)
            .insert(GraphicsObject::new(name, inner))
            .map(|h| h.cast())
            .ok_or(crate::GPUError::SlotError)
    }
}
