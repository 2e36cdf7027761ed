//! glint engine crate.
//!
//! Owns the platform + GPU runtime pieces the demos and the shader wrapper sit on:
//! a window, the GPU context bound to it, the per-frame callback loop, pointer input
//! and frame timing.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod render;
