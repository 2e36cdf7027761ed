//! Core engine-facing contracts.
//!
//! The interface between the runtime (platform loop) and the code that draws:
//! demos and the shader wrapper implement `App` and receive a `FrameCtx` per frame.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
