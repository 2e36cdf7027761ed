//! A colored quad drawn without the shader wrapper: pipeline, buffers, uniforms and
//! depth target are all set up by hand.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use glint_engine::core::{App, AppControl, FrameCtx};
use glint_engine::device::GpuInit;
use glint_engine::input::Key;
use glint_engine::logging::{init_logging, LoggingConfig};
use glint_engine::render::{RenderCtx, RenderTarget};
use glint_engine::window::{LogicalSize, Runtime, RuntimeConfig};
use wgpu::util::DeviceExt;

const SHADER: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    model_view: mat4x4<f32>,
}

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.projection * u.model_view * vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

const POSITIONS: [[f32; 2]; 4] = [[-1.0, 1.0], [1.0, 1.0], [-1.0, -1.0], [1.0, -1.0]];

const COLORS: [[f32; 4]; 4] = [
    [1.0, 1.0, 1.0, 1.0],
    [1.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 1.0, 1.0],
];

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    projection: [f32; 16],
    model_view: [f32; 16],
}

impl Uniforms {
    fn new(width: u32, height: u32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, aspect, 0.1, 100.0);
        let model_view = Mat4::from_translation(Vec3::new(0.0, 0.0, -6.0));
        Self {
            projection: projection.to_cols_array(),
            model_view: model_view.to_cols_array(),
        }
    }
}

#[derive(Default)]
struct QuadRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    ubo: Option<wgpu::Buffer>,

    position_vbo: Option<wgpu::Buffer>,
    color_vbo: Option<wgpu::Buffer>,

    depth: Option<(wgpu::TextureView, (u32, u32))>,
}

impl QuadRenderer {
    fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        self.ensure_pipeline(ctx);
        self.ensure_buffers(ctx);
        self.ensure_depth(ctx);

        if let Some(ubo) = self.ubo.as_ref() {
            let uniforms = Uniforms::new(ctx.size.width, ctx.size.height);
            ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&uniforms));
        }

        let (Some(pipeline), Some(bind_group), Some(positions), Some(colors), Some((depth, _))) = (
            self.pipeline.as_ref(),
            self.bind_group.as_ref(),
            self.position_vbo.as_ref(),
            self.color_vbo.as_ref(),
            self.depth.as_ref(),
        ) else {
            return;
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("hello-quad pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                // Cleared to opaque black by the frame.
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, positions.slice(..));
        rpass.set_vertex_buffer(1, colors.slice(..));
        rpass.draw(0..POSITIONS.len() as u32, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline.is_some() && self.pipeline_format == Some(ctx.surface_format) {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hello-quad shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hello-quad bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hello-quad pipeline layout"),
            bind_group_layouts: &[&bgl],
            immediate_size: 0,
        });

        let position_attr = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: 0,
        }];
        let color_attr = [wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: 0,
            shader_location: 1,
        }];
        let vertex_buffers = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &position_attr,
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 4]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &color_attr,
            },
        ];

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("hello-quad pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &vertex_buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("hello-quad ubo"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("hello-quad bind group"),
            layout: &bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        log::info!("hello-quad pipeline created for {:?}", ctx.surface_format);

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.ubo = Some(ubo);
        self.bind_group = Some(bind_group);
    }

    fn ensure_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.position_vbo.is_some() && self.color_vbo.is_some() {
            return;
        }

        self.position_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("hello-quad position vbo"),
            contents: bytemuck::cast_slice(&POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        self.color_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("hello-quad color vbo"),
            contents: bytemuck::cast_slice(&COLORS),
            usage: wgpu::BufferUsages::VERTEX,
        }));
    }

    fn ensure_depth(&mut self, ctx: &RenderCtx<'_>) {
        let size = (ctx.size.width.max(1), ctx.size.height.max(1));
        if matches!(&self.depth, Some((_, s)) if *s == size) {
            return;
        }

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hello-quad depth"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        self.depth = Some((texture.create_view(&wgpu::TextureViewDescriptor::default()), size));
    }
}

/// Window title with the frame rate, refreshed every 60 frames.
fn fps_title(frame_index: u64, dt_secs: f32) -> Option<String> {
    if frame_index % 60 != 0 || dt_secs <= 0.0 {
        return None;
    }
    Some(format!("hello quad ({:.0} fps)", 1.0 / dt_secs))
}

struct HelloQuad {
    renderer: QuadRenderer,
}

impl App for HelloQuad {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> anyhow::Result<AppControl> {
        if ctx.input_frame.key_pressed(Key::Escape) {
            return Ok(AppControl::Exit);
        }

        if let Some(title) = fps_title(ctx.time.frame_index, ctx.time.dt_secs()) {
            ctx.runtime.set_title(title);
        }

        let renderer = &mut self.renderer;
        Ok(ctx.render(Some(wgpu::Color::BLACK), |rctx, target| {
            renderer.render(rctx, target)
        }))
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "hello quad".to_string(),
        initial_size: LogicalSize::new(720.0, 540.0),
        resizable: true,
    };

    let app = HelloQuad {
        renderer: QuadRenderer::default(),
    };

    Runtime::run(config, GpuInit::default(), app).inspect_err(|err| log::error!("{err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn quad_sits_in_front_of_the_camera() {
        let u = Uniforms::new(720, 540);
        let mvp = Mat4::from_cols_array(&u.projection) * Mat4::from_cols_array(&u.model_view);

        for [x, y] in POSITIONS {
            let clip = mvp * Vec4::new(x, y, 0.0, 1.0);
            let ndc = clip / clip.w;
            assert!(clip.w > 0.0);
            assert!(ndc.x.abs() < 1.0 && ndc.y.abs() < 1.0);
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }

    #[test]
    fn zero_sized_surface_does_not_divide_by_zero() {
        let u = Uniforms::new(0, 0);
        assert!(u.projection.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn title_refreshes_every_sixty_frames() {
        assert_eq!(fps_title(0, 0.02).as_deref(), Some("hello quad (50 fps)"));
        assert_eq!(fps_title(1, 0.02), None);
        assert_eq!(fps_title(59, 0.02), None);
        assert!(fps_title(120, 1.0 / 144.0).is_some());
    }

    #[test]
    fn uniform_block_is_two_mat4() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 128);
    }
}
