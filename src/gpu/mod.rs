pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod execution;
pub mod object;
pub mod resources;
pub mod structs;

pub use config::{DeviceInfo, VALIDATION_ENV};
pub use device::Device;
pub use driver::command::*;
pub use driver::{
    BindCategory, BoundRange, Driver, ExecutionContext, NativeCall, NativeObject, NullDriver, RenderPass,
};
pub use driver::types::{BufferTarget, Capability, FramebufferTarget, NativeHandle};
pub use error::{ErrorClass, GPUError, OrFatal, Result};
pub use object::{AnyHandle, GraphicsObject, GraphicsResource, ObjectKind};
pub use resources::*;
pub use structs::*;
