use anyhow::Result;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by the demos and the shader wrapper.
pub trait App {
    /// Called once per rendered frame, from the animation-frame loop.
    ///
    /// An error stops the loop and is returned from `Runtime::run`.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl>;

    /// Called once after the loop has stopped.
    fn on_exit(&mut self) {}
}
