//! Window loop for a single [`Shader`].

use anyhow::Context as _;
use glint_engine::core::{App, AppControl, FrameCtx};
use glint_engine::device::GpuInit;
use glint_engine::input::Key;
use glint_engine::window::Runtime;

use crate::options::{ResizeCallback, ShaderOptions, UpdateCallback};
use crate::shader::Shader;

/// Drives one [`Shader`]: resize, pointer, time, draw, update callback.
pub struct ShaderApp {
    options: ShaderOptions,
    on_resize: Option<ResizeCallback>,
    on_update: Option<UpdateCallback>,
    shader: Option<Shader>,
    /// Last `(width, height, dpi)` passed to the resize routine.
    last_size: Option<(f32, f32, f32)>,
}

impl ShaderApp {
    pub fn new(mut options: ShaderOptions) -> Self {
        let on_resize = options.on_resize.take();
        let on_update = options.on_update.take();
        Self {
            options,
            on_resize,
            on_update,
            shader: None,
            last_size: None,
        }
    }

    pub fn shader(&self) -> Option<&Shader> {
        self.shader.as_ref()
    }

    fn resize_if_needed(&mut self, ctx: &FrameCtx<'_, '_>) {
        let Some(shader) = self.shader.as_mut() else {
            return;
        };

        let (width, height) = ctx.window.logical_size();
        let dpi = ctx.window.scale_factor();
        let size = (width, height, dpi);

        let Some(update) = resize_action(self.last_size, size, self.options.autosize) else {
            return;
        };

        shader.resize(&ctx.render_ctx(), width, height, dpi, update);
        if !update {
            return;
        }
        self.last_size = Some(size);

        if let Some(on_resize) = self.on_resize.as_mut() {
            on_resize(shader, width, height, dpi);
        }
    }
}

/// Decides what a frame at `now` does about size.
///
/// `None` when nothing changed. Otherwise `Some(update)`: attachments always follow the
/// surface, and `update` says whether the `resolution`/`projection` uniforms and the
/// resize callback follow too. Without autosize that happens only on the first frame.
fn resize_action(
    last: Option<(f32, f32, f32)>,
    now: (f32, f32, f32),
    autosize: bool,
) -> Option<bool> {
    match last {
        None => Some(true),
        Some(last) if last == now => None,
        Some(_) => Some(autosize),
    }
}

impl App for ShaderApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> anyhow::Result<AppControl> {
        if self.shader.is_none() {
            let shader = Shader::new(&ctx.render_ctx(), &self.options)
                .context("failed to create shader")?;
            log::info!(
                "shader ready on {}: {} uniforms, {} attribute buffers, {} vertices",
                ctx.gpu.adapter_info().name,
                shader.uniforms().len(),
                shader.buffers().len(),
                shader.count()
            );
            self.shader = Some(shader);
        }

        if ctx.input_frame.key_pressed(Key::Escape) {
            return Ok(AppControl::Exit);
        }

        self.resize_if_needed(ctx);

        let Some(shader) = self.shader.as_mut() else {
            return Ok(AppControl::Continue);
        };

        if self.options.mousemove && ctx.input_frame.pointer_moved {
            if let Some((x, y)) = ctx.input.pointer_pos {
                shader.mousemove(x, y);
            }
        }

        shader.set_time(ctx.time.elapsed);

        let control = ctx.render(None, |rctx, target| shader.render(rctx, target));

        if let Some(on_update) = self.on_update.as_mut() {
            on_update(shader, ctx.time.dt);
        }

        Ok(control)
    }

    fn on_exit(&mut self) {
        log::debug!("releasing shader resources");
        self.shader = None;
    }
}

/// Opens a window and runs `options` until it is closed.
pub fn run(options: ShaderOptions) -> anyhow::Result<()> {
    let config = options.window.clone();
    Runtime::run(config, GpuInit::default(), ShaderApp::new(options))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: (f32, f32, f32) = (800.0, 600.0, 1.0);
    const LARGE: (f32, f32, f32) = (1280.0, 720.0, 1.0);

    #[test]
    fn first_frame_always_runs_the_full_resize() {
        assert_eq!(resize_action(None, SMALL, true), Some(true));
        assert_eq!(resize_action(None, SMALL, false), Some(true));
    }

    #[test]
    fn unchanged_size_does_nothing() {
        assert_eq!(resize_action(Some(SMALL), SMALL, true), None);
        assert_eq!(resize_action(Some(SMALL), SMALL, false), None);
    }

    #[test]
    fn changed_size_with_autosize_updates_uniforms() {
        assert_eq!(resize_action(Some(SMALL), LARGE, true), Some(true));
    }

    #[test]
    fn changed_size_without_autosize_only_moves_attachments() {
        assert_eq!(resize_action(Some(SMALL), LARGE, false), Some(false));
    }

    #[test]
    fn scale_factor_change_counts_as_a_resize() {
        let hidpi = (SMALL.0, SMALL.1, 2.0);
        assert_eq!(resize_action(Some(SMALL), hidpi, true), Some(true));
    }
}
