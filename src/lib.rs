//! Backend-agnostic GPU command recording and execution.
//!
//! Resources live in a [`Device`] and are named by generational
//! [`Handle`]s. Work is recorded into a [`CommandList`] on any thread and
//! replayed by [`Device::execute`] against the calling thread's
//! [`ExecutionContext`], which skips redundant native state changes.

pub mod gpu;
pub mod utils;

pub use gpu::*;
pub use utils::{Handle, Pool};
