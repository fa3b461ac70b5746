mod descriptors;
pub(crate) mod engine;
mod pipeline_state;
mod vertex_layout;
