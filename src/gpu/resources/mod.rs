pub mod buffer;
pub mod descriptors;
pub mod pipeline;
pub mod primitive_buffer;
pub mod query;
pub mod surface;
pub mod texture;

pub use buffer::*;
pub use descriptors::*;
pub use pipeline::{PipelineFlags, PipelineInfo, Pipeline, ShaderEntry};
pub use primitive_buffer::*;
pub use query::*;
pub use surface::{Surface, SurfaceInfo, MAX_COLOR_ATTACHMENTS};
pub use texture::*;
