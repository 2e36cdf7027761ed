use std::time::Duration;

use glint_engine::render::{RenderCtx, RenderTarget};

use crate::buffer::BufferSet;
use crate::camera::Camera;
use crate::error::ShaderError;
use crate::options::ShaderOptions;
use crate::program::{self, PipelineState, Program, DEPTH_FORMAT, MSAA_SAMPLES};
use crate::texture::{GpuTexture, TextureSource};
use crate::uniform::{UniformSet, UniformValue};

/// Maps a pointer position in logical pixels to `[-1, 1]` on both axes.
///
/// Y is not flipped: the top edge maps to -1.
pub fn pointer_to_clip(x: f32, y: f32, width: f32, height: f32) -> [f32; 2] {
    if width <= 0.0 || height <= 0.0 {
        return [0.0, 0.0];
    }
    [x / width * 2.0 - 1.0, y / height * 2.0 - 1.0]
}

/// Seconds since start-up divided by five, keeping sub-millisecond precision.
fn time_value(elapsed: Duration) -> f32 {
    elapsed.as_secs_f32() / 5.0
}

/// GPU copy of one attribute buffer. Grows, never shrinks.
#[derive(Default)]
struct VertexBuffer {
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
    len: u64,
}

impl VertexBuffer {
    fn upload(&mut self, ctx: &RenderCtx<'_>, name: &str, data: &[f32]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.len = bytes.len() as u64;
        if self.len == 0 {
            return;
        }

        if self.buffer.is_none() || self.capacity < self.len {
            let capacity = self.len.next_power_of_two().max(64);
            log::debug!("allocating vertex buffer `{name}`: {capacity} bytes");
            self.buffer = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("glint vertex buffer"),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.capacity = capacity;
        }

        if let Some(buffer) = &self.buffer {
            ctx.queue.write_buffer(buffer, 0, bytes);
        }
    }
}

/// Depth and multisample targets, sized to the surface.
#[derive(Default)]
struct Attachments {
    size: (u32, u32),
    depth: Option<wgpu::TextureView>,
    msaa: Option<wgpu::TextureView>,
}

impl Attachments {
    fn ensure(&mut self, ctx: &RenderCtx<'_>, state: &PipelineState) {
        let size = (ctx.size.width.max(1), ctx.size.height.max(1));
        let wanted_depth = state.depth_test;
        let wanted_msaa = state.sample_count > 1;
        if self.size == size
            && self.depth.is_some() == wanted_depth
            && self.msaa.is_some() == wanted_msaa
        {
            return;
        }

        let extent = wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        };
        let make = |label: &str, format: wgpu::TextureFormat| {
            ctx.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: extent,
                    mip_level_count: 1,
                    sample_count: state.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        };

        self.depth = wanted_depth.then(|| make("glint depth", DEPTH_FORMAT));
        self.msaa = wanted_msaa.then(|| make("glint msaa color", ctx.surface_format));
        self.size = size;
    }
}

/// One window's worth of drawing state: a linked program, its uniforms and attribute
/// buffers, a texture and the projection camera.
///
/// Uniform and buffer writes are CPU-side and cheap; changed data is uploaded once
/// when the next frame is rendered.
pub struct Shader {
    uniforms: UniformSet,
    buffers: BufferSet,
    camera: Camera,

    program: Program,
    state: PipelineState,

    uniform_buffer: wgpu::Buffer,
    vertex_buffers: Vec<VertexBuffer>,
    texture: GpuTexture,
    pending_texture: Option<TextureSource>,
    bind_group: wgpu::BindGroup,
    attachments: Attachments,

    width: f32,
    height: f32,
    dpi: f32,
    warned_inconsistent: bool,
}

impl Shader {
    /// Compiles the program and creates every GPU resource described by `options`.
    ///
    /// A texture that fails to load is logged and replaced by the transparent
    /// placeholder; compile and declaration errors are returned.
    pub fn new(ctx: &RenderCtx<'_>, options: &ShaderOptions) -> Result<Self, ShaderError> {
        let mut uniforms = UniformSet::with_defaults(options.uniforms.iter().cloned());
        let buffers = BufferSet::with_defaults(options.buffers.iter().cloned())?;

        let state = PipelineState {
            topology: options.primitive.topology(),
            cull_mode: options.side.cull_mode(),
            depth_test: options.depth_test,
            sample_count: if options.antialias { MSAA_SAMPLES } else { 1 },
        };

        let source = program::assemble(&uniforms, &buffers, &options.vertex, &options.fragment);
        let program = Program::new(
            ctx.device,
            ctx.surface_format,
            &source,
            &uniforms,
            &buffers,
            state,
        )?;

        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("glint uniforms"),
            size: uniforms.size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let texture = match &options.texture {
            Some(source) => match GpuTexture::load(ctx.device, ctx.queue, source) {
                Ok(texture) => {
                    uniforms.set_builtin("has_texture", UniformValue::Int(1));
                    texture
                }
                Err(err) => {
                    log::error!("{err}");
                    GpuTexture::placeholder(ctx.device, ctx.queue)
                }
            },
            None => GpuTexture::placeholder(ctx.device, ctx.queue),
        };

        let bind_group = create_bind_group(ctx.device, &program, &uniform_buffer, &texture);
        let vertex_buffers = (0..buffers.len()).map(|_| VertexBuffer::default()).collect();

        let mut shader = Self {
            uniforms,
            buffers,
            camera: options.camera,
            program,
            state,
            uniform_buffer,
            vertex_buffers,
            texture,
            pending_texture: None,
            bind_group,
            attachments: Attachments::default(),
            width: 0.0,
            height: 0.0,
            dpi: 1.0,
            warned_inconsistent: false,
        };
        shader.check_consistency();
        Ok(shader)
    }

    // ── uniforms ──────────────────────────────────────────────────────────

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name)
    }

    /// Sets a declared uniform; takes effect on the next rendered frame.
    pub fn set_uniform(
        &mut self,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), ShaderError> {
        self.uniforms.set(name, value)
    }

    // ── buffers ───────────────────────────────────────────────────────────

    pub fn buffers(&self) -> &BufferSet {
        &self.buffers
    }

    pub fn buffer(&self, name: &str) -> Option<&[f32]> {
        self.buffers.get(name).map(|b| b.data.as_slice())
    }

    /// Replaces an attribute buffer's data; uploaded on the next rendered frame.
    pub fn set_buffer(&mut self, name: &str, data: Vec<f32>) -> Result<(), ShaderError> {
        self.buffers.set(name, data)?;
        self.check_consistency();
        Ok(())
    }

    /// Vertices drawn per frame.
    pub fn count(&self) -> u32 {
        self.buffers.vertex_count()
    }

    fn check_consistency(&mut self) {
        if self.buffers.is_consistent() {
            self.warned_inconsistent = false;
        } else if !self.warned_inconsistent {
            let counts: Vec<String> = self
                .buffers
                .names()
                .map(|n| format!("{n}={}", self.buffers.vertex_count_of(n).unwrap_or(0)))
                .collect();
            log::warn!(
                "attribute buffers disagree on vertex count ({}); drawing {}",
                counts.join(", "),
                self.count()
            );
            self.warned_inconsistent = true;
        }
    }

    // ── camera / viewport ─────────────────────────────────────────────────

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replaces the camera and rebuilds the projection for the current size.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.update_projection();
    }

    /// Logical width of the drawing area.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Logical height of the drawing area.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Physical pixels per logical pixel.
    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    fn update_projection(&mut self) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return;
        }
        let projection = self.camera.projection(self.width, self.height);
        self.uniforms
            .set_builtin("projection", UniformValue::Mat4(projection));
    }

    /// Adopts a new drawing-area size.
    ///
    /// Depth/multisample targets always follow the surface. With `update_uniforms` the
    /// `resolution` and `projection` uniforms are rebuilt as well.
    pub fn resize(
        &mut self,
        ctx: &RenderCtx<'_>,
        width: f32,
        height: f32,
        dpi: f32,
        update_uniforms: bool,
    ) {
        self.attachments.ensure(ctx, &self.state);

        if !update_uniforms {
            return;
        }

        self.width = width;
        self.height = height;
        self.dpi = dpi;

        self.uniforms
            .set_builtin("resolution", UniformValue::Vec2([width, height]));
        self.update_projection();
        log::debug!("resized to {width}x{height} @ {dpi}x");
    }

    /// Feeds a pointer position (logical pixels) into the `mousemove` uniform.
    pub fn mousemove(&mut self, x: f32, y: f32) {
        let pos = pointer_to_clip(x, y, self.width, self.height);
        self.uniforms.set_builtin("mousemove", UniformValue::Vec2(pos));
    }

    /// Sets the `time` uniform from the time since start-up. It advances by one
    /// every five seconds.
    pub fn set_time(&mut self, elapsed: Duration) {
        self.uniforms
            .set_builtin("time", UniformValue::Float(time_value(elapsed)));
    }

    // ── texture ───────────────────────────────────────────────────────────

    /// Queues `source` to replace the texture; it is decoded and uploaded before the
    /// next frame is drawn.
    pub fn load_texture(&mut self, source: impl Into<TextureSource>) {
        self.pending_texture = Some(source.into());
    }

    /// Size of the bound texture; `(1, 1)` for the placeholder.
    pub fn texture_size(&self) -> (u32, u32) {
        self.texture.size
    }

    fn apply_pending_texture(&mut self, ctx: &RenderCtx<'_>) {
        let Some(source) = self.pending_texture.take() else {
            return;
        };

        match GpuTexture::load(ctx.device, ctx.queue, &source) {
            Ok(texture) => {
                self.texture = texture;
                self.uniforms.set_builtin("has_texture", UniformValue::Int(1));
                self.bind_group = create_bind_group(
                    ctx.device,
                    &self.program,
                    &self.uniform_buffer,
                    &self.texture,
                );
            }
            Err(err) => log::error!("{err}"),
        }
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Uploads what changed, clears the target to transparent black and draws
    /// `count()` vertices (nothing when it is zero).
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        self.apply_pending_texture(ctx);
        self.attachments.ensure(ctx, &self.state);

        if self.uniforms.take_dirty() {
            ctx.queue
                .write_buffer(&self.uniform_buffer, 0, &self.uniforms.bytes());
        }

        let vertex_buffers = &mut self.vertex_buffers;
        self.buffers.drain_dirty(|slot, name, data| {
            if let Some(vb) = vertex_buffers.get_mut(slot) {
                vb.upload(ctx, name, data);
            }
        });

        let (view, resolve_target) = match &self.attachments.msaa {
            Some(msaa) => (msaa, Some(target.color_view)),
            None => (target.color_view, None),
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("glint shader pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: self.attachments.depth.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let count = self.count();
        if count == 0 {
            return;
        }

        rpass.set_pipeline(&self.program.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        for (slot, vb) in self.vertex_buffers.iter().enumerate() {
            let Some(buffer) = vb.buffer.as_ref() else { return };
            rpass.set_vertex_buffer(slot as u32, buffer.slice(0..vb.len));
        }
        rpass.draw(0..count, 0..1);
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    program: &Program,
    uniform_buffer: &wgpu::Buffer,
    texture: &GpuTexture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("glint bind group"),
        layout: &program.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_corners_map_to_unit_square() {
        assert_eq!(pointer_to_clip(0.0, 0.0, 800.0, 600.0), [-1.0, -1.0]);
        assert_eq!(pointer_to_clip(800.0, 600.0, 800.0, 600.0), [1.0, 1.0]);
        assert_eq!(pointer_to_clip(400.0, 300.0, 800.0, 600.0), [0.0, 0.0]);
    }

    #[test]
    fn pointer_y_is_not_flipped() {
        let [_, y] = pointer_to_clip(0.0, 150.0, 800.0, 600.0);
        assert_eq!(y, -0.5);
    }

    #[test]
    fn time_advances_one_unit_per_five_seconds() {
        assert_eq!(time_value(Duration::ZERO), 0.0);
        assert!((time_value(Duration::from_secs(5)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn time_keeps_fractional_milliseconds() {
        let t = time_value(Duration::from_micros(1500));
        assert!((t - 0.0003).abs() < 1e-8, "time was {t}");
    }

    #[test]
    fn pointer_on_empty_area_is_centered() {
        assert_eq!(pointer_to_clip(10.0, 10.0, 0.0, 0.0), [0.0, 0.0]);
    }
}
