//! Construction options for [`Shader`](crate::Shader).

use std::time::Duration;

use glint_engine::window::{LogicalSize, RuntimeConfig};

use crate::buffer::AttributeBuffer;
use crate::camera::Camera;
use crate::shader::Shader;
use crate::texture::TextureSource;
use crate::uniform::UniformValue;

/// Default vertex stage: projects `position`, passes `color` through and derives a
/// screen-space texture coordinate.
pub const DEFAULT_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.projection * vec4<f32>(in.position, 1.0);
    out.color = in.color;
    let ndc = out.clip_position.xy / out.clip_position.w;
    out.uv = ndc * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5, 0.5);
    return out;
}
"#;

/// Default fragment stage: the vertex color, modulated by the texture when one is set.
pub const DEFAULT_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(u_texture, u_sampler, in.uv);
    if (u.has_texture == 1) {
        return in.color * texel;
    }
    return in.color;
}
"#;

/// Which faces are drawn.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Side {
    /// Counter-clockwise faces; back faces are culled.
    #[default]
    Front,
    /// Clockwise faces; front faces are culled.
    Back,
    /// Both.
    Double,
}

impl Side {
    pub(crate) fn cull_mode(self) -> Option<wgpu::Face> {
        match self {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        }
    }
}

/// How vertices are assembled.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Primitive {
    /// One point per vertex. Points are always 1px under WebGPU.
    #[default]
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl Primitive {
    pub(crate) fn topology(self) -> wgpu::PrimitiveTopology {
        match self {
            Primitive::Points => wgpu::PrimitiveTopology::PointList,
            Primitive::Lines => wgpu::PrimitiveTopology::LineList,
            Primitive::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Primitive::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

/// Called after a resize with `(shader, width, height, dpi)`; sizes are logical pixels.
pub type ResizeCallback = Box<dyn FnMut(&mut Shader, f32, f32, f32)>;

/// Called after each drawn frame with the time since the previous frame.
pub type UpdateCallback = Box<dyn FnMut(&mut Shader, Duration)>;

/// Everything a [`Shader`] is built from. Start from `ShaderOptions::default()` (the
/// preset) and override what differs.
pub struct ShaderOptions {
    /// Window title and initial size.
    pub window: RuntimeConfig,
    /// 4x multisampling.
    pub antialias: bool,
    pub depth_test: bool,
    /// Feed the pointer position into the `mousemove` uniform.
    pub mousemove: bool,
    /// Follow window resizes. When off the resize routine runs once at start-up.
    pub autosize: bool,
    pub side: Side,
    pub primitive: Primitive,
    pub vertex: String,
    pub fragment: String,
    pub uniforms: Vec<(String, UniformValue)>,
    pub buffers: Vec<(String, AttributeBuffer)>,
    pub camera: Camera,
    pub texture: Option<TextureSource>,
    pub on_resize: Option<ResizeCallback>,
    pub on_update: Option<UpdateCallback>,
}

impl Default for ShaderOptions {
    fn default() -> Self {
        Self {
            window: RuntimeConfig::default(),
            antialias: false,
            depth_test: false,
            mousemove: false,
            autosize: true,
            side: Side::Front,
            primitive: Primitive::Points,
            vertex: DEFAULT_VERTEX.to_string(),
            fragment: DEFAULT_FRAGMENT.to_string(),
            uniforms: Vec::new(),
            buffers: Vec::new(),
            camera: Camera::default(),
            texture: None,
            on_resize: None,
            on_update: None,
        }
    }
}

impl ShaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    /// Initial window size in logical pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.window.initial_size = LogicalSize::new(width, height);
        self
    }

    pub fn antialias(mut self, on: bool) -> Self {
        self.antialias = on;
        self
    }

    pub fn depth_test(mut self, on: bool) -> Self {
        self.depth_test = on;
        self
    }

    pub fn mousemove(mut self, on: bool) -> Self {
        self.mousemove = on;
        self
    }

    pub fn autosize(mut self, on: bool) -> Self {
        self.autosize = on;
        self.window.resizable = on;
        self
    }

    pub fn side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = primitive;
        self
    }

    pub fn vertex(mut self, src: impl Into<String>) -> Self {
        self.vertex = src.into();
        self
    }

    pub fn fragment(mut self, src: impl Into<String>) -> Self {
        self.fragment = src.into();
        self
    }

    /// Declares a uniform, or overrides a default one.
    pub fn uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniforms.push((name.into(), value.into()));
        self
    }

    /// Declares an attribute buffer of `size` components, or overrides a default one.
    pub fn buffer(mut self, name: impl Into<String>, size: u32, data: Vec<f32>) -> Self {
        self.buffers.push((name.into(), AttributeBuffer::new(size, data)));
        self
    }

    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn texture(mut self, source: impl Into<TextureSource>) -> Self {
        self.texture = Some(source.into());
        self
    }

    pub fn on_resize(mut self, f: impl FnMut(&mut Shader, f32, f32, f32) + 'static) -> Self {
        self.on_resize = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl FnMut(&mut Shader, Duration) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_matches_documented_defaults() {
        let opts = ShaderOptions::default();

        assert!(!opts.antialias);
        assert!(!opts.depth_test);
        assert!(!opts.mousemove);
        assert!(opts.autosize);
        assert_eq!(opts.side, Side::Front);
        assert_eq!(opts.primitive, Primitive::Points);
        assert_eq!(opts.camera, Camera::default());
        assert!(opts.texture.is_none());
        assert!(opts.uniforms.is_empty() && opts.buffers.is_empty());
    }

    #[test]
    fn builder_records_declarations_in_order() {
        let opts = ShaderOptions::new()
            .uniform("speed", 2.0f32)
            .uniform("tint", [1.0f32, 0.5, 0.5, 1.0])
            .buffer("size", 1, vec![4.0, 8.0]);

        assert_eq!(opts.uniforms[0], ("speed".to_string(), UniformValue::Float(2.0)));
        assert_eq!(opts.uniforms[1].1, UniformValue::Vec4([1.0, 0.5, 0.5, 1.0]));
        assert_eq!(opts.buffers[0].1, AttributeBuffer::new(1, vec![4.0, 8.0]));
    }

    #[test]
    fn fixed_size_window_is_not_resizable() {
        let opts = ShaderOptions::new().autosize(false);
        assert!(!opts.window.resizable);
    }

    #[test]
    fn side_maps_to_cull_mode() {
        assert_eq!(Side::Front.cull_mode(), Some(wgpu::Face::Back));
        assert_eq!(Side::Back.cull_mode(), Some(wgpu::Face::Front));
        assert_eq!(Side::Double.cull_mode(), None);
    }

    #[test]
    fn primitive_maps_to_topology() {
        assert_eq!(Primitive::Points.topology(), wgpu::PrimitiveTopology::PointList);
        assert_eq!(
            Primitive::TriangleStrip.topology(),
            wgpu::PrimitiveTopology::TriangleStrip
        );
    }
}
