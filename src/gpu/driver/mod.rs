//! The seam between recorded commands and a native graphics API.
//!
//! [`command`] holds the wire format, [`native`] the [`Driver`] trait,
//! [`state`] the per-thread cache the engine consults before talking to a
//! driver.

pub mod command;
pub mod gl;
pub mod native;
pub mod null;
pub mod state;
pub mod types;

pub use command::{CommandAvailability, CommandList, CommandSink, Op};
pub use native::{native, Driver};
pub use null::NullDriver;
pub use state::{BindCategory, BoundRange, ExecutionContext, RenderPass};
pub use types::{Abstract, NativeCall, NativeEnum, NativeHandle, NativeObject};
