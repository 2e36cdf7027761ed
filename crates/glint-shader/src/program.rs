//! Compiling and linking the program.
//!
//! The user supplies a vertex and a fragment WGSL snippet. They are joined behind a
//! generated prelude (uniform struct, texture bindings, vertex inputs), validated with
//! naga for a readable log, and turned into a render pipeline.

use std::num::NonZeroU64;

use crate::buffer::BufferSet;
use crate::error::ShaderError;
use crate::uniform::UniformSet;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub(crate) const MSAA_SAMPLES: u32 = 4;

/// Generated declarations placed in front of the user's sources.
pub fn prelude(uniforms: &UniformSet, buffers: &BufferSet) -> String {
    format!(
        "{}\n\
         @group(0) @binding(0) var<uniform> u: Uniforms;\n\
         @group(0) @binding(1) var u_texture: texture_2d<f32>;\n\
         @group(0) @binding(2) var u_sampler: sampler;\n\
         \n\
         {}",
        uniforms.wgsl_struct(),
        buffers.wgsl_struct()
    )
}

/// Full module source: prelude, vertex stage, fragment stage.
pub fn assemble(uniforms: &UniformSet, buffers: &BufferSet, vertex: &str, fragment: &str) -> String {
    format!("{}\n{vertex}\n{fragment}\n", prelude(uniforms, buffers))
}

/// Parses and validates `source`, then checks both entry points exist.
///
/// Parse and validation failures are `Compile` errors carrying the compiler log;
/// a missing entry point is a `Link` error. Checks that need both stages together
/// happen when the pipeline is built.
pub fn check(source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Compile {
        log: err.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    );
    validator
        .validate(&module)
        .map_err(|err| ShaderError::Compile {
            log: err.emit_to_string(source),
        })?;

    for (name, stage, label) in [
        (VERTEX_ENTRY, naga::ShaderStage::Vertex, "vertex"),
        (FRAGMENT_ENTRY, naga::ShaderStage::Fragment, "fragment"),
    ] {
        let found = module
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage);
        if !found {
            return Err(ShaderError::Link {
                log: format!("missing {label} entry point `{name}`"),
            });
        }
    }

    Ok(module)
}

/// Fixed-function state baked into the pipeline.
#[derive(Debug, Copy, Clone)]
pub(crate) struct PipelineState {
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_test: bool,
    pub sample_count: u32,
}

/// A linked program: pipeline plus the layout its bind group must follow.
pub(crate) struct Program {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
}

impl Program {
    pub(crate) fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        source: &str,
        uniforms: &UniformSet,
        buffers: &BufferSet,
        state: PipelineState,
    ) -> Result<Self, ShaderError> {
        if let Err(err) = check(source) {
            log::error!("{err}");
            return Err(err);
        }

        // Stage interface and binding visibility are only checked from here on.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glint shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glint bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(uniforms.size()),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glint pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let vertex_buffers = buffers.layouts();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("glint pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &vertex_buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(additive_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: state.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: state.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: state.depth_test.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),

            multisample: wgpu::MultisampleState {
                count: state.sample_count,
                ..Default::default()
            },

            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            let err = ShaderError::Link {
                log: err.to_string(),
            };
            log::error!("{err}");
            return Err(err);
        }

        log::debug!(
            "program linked: {} uniforms ({} bytes), {} attribute buffers",
            uniforms.len(),
            uniforms.size(),
            buffers.len()
        );

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }
}

/// `src * src_alpha + dst`: overlapping points accumulate.
fn additive_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::AttributeBuffer;
    use crate::options::{DEFAULT_FRAGMENT, DEFAULT_VERTEX};
    use crate::uniform::UniformValue;

    fn default_sets() -> (UniformSet, BufferSet) {
        (
            UniformSet::with_defaults(Vec::<(String, UniformValue)>::new()),
            BufferSet::with_defaults(Vec::<(String, AttributeBuffer)>::new()).unwrap(),
        )
    }

    #[test]
    fn prelude_declares_bindings_and_inputs() {
        let (uniforms, buffers) = default_sets();
        let src = prelude(&uniforms, &buffers);

        assert!(src.contains("var<uniform> u: Uniforms;"));
        assert!(src.contains("@group(0) @binding(1) var u_texture: texture_2d<f32>;"));
        assert!(src.contains("@group(0) @binding(2) var u_sampler: sampler;"));
        assert!(src.contains("@location(1) color: vec4<f32>,"));
    }

    #[test]
    fn default_program_compiles_and_links() {
        let (uniforms, buffers) = default_sets();
        let source = assemble(&uniforms, &buffers, DEFAULT_VERTEX, DEFAULT_FRAGMENT);

        let module = check(&source).unwrap();
        assert_eq!(module.entry_points.len(), 2);
    }

    #[test]
    fn custom_uniform_is_reachable_from_user_code() {
        let uniforms = UniformSet::with_defaults([("scale", UniformValue::Float(2.0))]);
        let buffers = BufferSet::with_defaults(Vec::<(String, AttributeBuffer)>::new()).unwrap();
        let vertex = "
            @vertex
            fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
                return u.projection * vec4<f32>(in.position * u.scale, 1.0);
            }
        ";
        let fragment = "
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0, 1.0, 1.0, 1.0);
            }
        ";

        assert!(check(&assemble(&uniforms, &buffers, vertex, fragment)).is_ok());
    }

    #[test]
    fn syntax_error_is_a_compile_error_with_log() {
        let (uniforms, buffers) = default_sets();
        let vertex = "@vertex fn vs_main( -> @builtin(position) vec4<f32> {}";
        let source = assemble(&uniforms, &buffers, vertex, DEFAULT_FRAGMENT);

        match check(&source) {
            Err(ShaderError::Compile { log }) => assert!(!log.is_empty()),
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_uniform_is_a_compile_error() {
        let (uniforms, buffers) = default_sets();
        let vertex = "
            @vertex
            fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
                return vec4<f32>(in.position * u.missing, 1.0);
            }
        ";
        let fragment = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";

        assert!(matches!(
            check(&assemble(&uniforms, &buffers, vertex, fragment)),
            Err(ShaderError::Compile { .. })
        ));
    }

    #[test]
    fn missing_fragment_entry_is_a_link_error() {
        let (uniforms, buffers) = default_sets();
        let source = assemble(&uniforms, &buffers, DEFAULT_VERTEX, "");

        match check(&source) {
            Err(ShaderError::Link { log }) => assert!(log.contains("fragment entry point")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    #[test]
    fn misnamed_vertex_entry_is_a_link_error() {
        let (uniforms, buffers) = default_sets();
        let vertex = DEFAULT_VERTEX.replace("fn vs_main", "fn vertex_main");
        let source = assemble(&uniforms, &buffers, &vertex, DEFAULT_FRAGMENT);

        match check(&source) {
            Err(ShaderError::Link { log }) => assert!(log.contains("`vs_main`")),
            other => panic!("expected link error, got {other:?}"),
        }
    }

    fn noop_device() -> (wgpu::Device, wgpu::Queue) {
        wgpu::Device::noop(&wgpu::DeviceDescriptor::default())
    }

    fn build(vertex: &str, fragment: &str) -> Result<Program, ShaderError> {
        let (device, _queue) = noop_device();
        let (uniforms, buffers) = default_sets();
        let source = assemble(&uniforms, &buffers, vertex, fragment);
        let state = PipelineState {
            topology: wgpu::PrimitiveTopology::PointList,
            cull_mode: None,
            depth_test: false,
            sample_count: 1,
        };
        Program::new(
            &device,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            &source,
            &uniforms,
            &buffers,
            state,
        )
    }

    #[test]
    fn default_program_builds_a_pipeline() {
        assert!(build(DEFAULT_VERTEX, DEFAULT_FRAGMENT).is_ok());
    }

    #[test]
    fn vertex_stage_may_sample_the_texture() {
        let vertex = "
            @vertex
            fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
                let texel = textureSampleLevel(u_texture, u_sampler, vec2<f32>(0.5, 0.5), 0.0);
                return u.projection * vec4<f32>(in.position + texel.xyz, 1.0);
            }
        ";
        let fragment = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";

        assert!(build(vertex, fragment).is_ok());
    }

    #[test]
    fn fragment_input_without_vertex_output_is_a_link_error() {
        let vertex = "
            @vertex
            fn vs_main(in: VertexInput) -> @builtin(position) vec4<f32> {
                return vec4<f32>(in.position, 1.0);
            }
        ";
        let fragment = "
            @fragment
            fn fs_main(@location(3) tint: vec4<f32>) -> @location(0) vec4<f32> {
                return tint;
            }
        ";

        // Each stage is valid on its own.
        let (uniforms, buffers) = default_sets();
        assert!(check(&assemble(&uniforms, &buffers, vertex, fragment)).is_ok());

        match build(vertex, fragment) {
            Err(ShaderError::Link { log }) => assert!(!log.is_empty()),
            Err(other) => panic!("expected link error, got {other:?}"),
            Ok(_) => panic!("expected link error, got a pipeline"),
        }
    }
}
