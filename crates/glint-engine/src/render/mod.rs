//! Renderer-facing handles.
//!
//! Renderers own their GPU resources (pipelines, buffers, textures) and record into the
//! frame's encoder through these borrowed views.

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
