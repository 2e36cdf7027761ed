//! A rotating point sphere on the shader wrapper. The pointer tilts it; an image path
//! given as the first argument tints it.

use std::f32::consts::PI;
use std::time::Duration;

use glint_engine::logging::{init_logging, LoggingConfig};
use glint_shader::{Primitive, Shader, ShaderOptions};

const VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) uv: vec2<f32>,
}

fn rotate_y(p: vec3<f32>, a: f32) -> vec3<f32> {
    let c = cos(a);
    let s = sin(a);
    return vec3<f32>(c * p.x + s * p.z, p.y, -s * p.x + c * p.z);
}

fn rotate_x(p: vec3<f32>, a: f32) -> vec3<f32> {
    let c = cos(a);
    let s = sin(a);
    return vec3<f32>(p.x, c * p.y - s * p.z, s * p.y + c * p.z);
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var p = rotate_y(in.position, u.time * u.speed + u.mousemove.x);
    p = rotate_x(p, u.mousemove.y);

    var out: VertexOutput;
    out.clip_position = u.projection * vec4<f32>(p, 1.0);
    out.color = in.color;
    out.uv = in.position.xy / (2.0 * u.radius) + vec2<f32>(0.5, 0.5);
    return out;
}
"#;

const POINT_COUNT: usize = 4000;
const RADIUS: f32 = 40.0;

/// Evenly spread points on a sphere (golden-angle spiral), colored by position.
fn sphere(count: usize, radius: f32) -> (Vec<f32>, Vec<f32>) {
    let golden = PI * (3.0 - 5f32.sqrt());
    let mut positions = Vec::with_capacity(count * 3);
    let mut colors = Vec::with_capacity(count * 4);

    for i in 0..count {
        let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
        let r = (1.0 - y * y).sqrt();
        let theta = golden * i as f32;
        let (x, z) = (r * theta.cos(), r * theta.sin());

        positions.extend_from_slice(&[x * radius, y * radius, z * radius]);
        colors.extend_from_slice(&[0.5 + 0.5 * x, 0.5 + 0.5 * y, 0.5 + 0.5 * z, 0.8]);
    }

    (positions, colors)
}

/// Logs the average frame time every `every` frames.
struct FrameStats {
    every: u32,
    frames: u32,
    total: Duration,
}

impl FrameStats {
    fn new(every: u32) -> Self {
        Self {
            every,
            frames: 0,
            total: Duration::ZERO,
        }
    }

    fn record(&mut self, dt: Duration) -> Option<Duration> {
        self.frames += 1;
        self.total += dt;
        if self.frames < self.every {
            return None;
        }
        let avg = self.total / self.frames;
        self.frames = 0;
        self.total = Duration::ZERO;
        Some(avg)
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let (positions, colors) = sphere(POINT_COUNT, RADIUS);
    let mut stats = FrameStats::new(120);

    let mut options = ShaderOptions::new()
        .title("points")
        .size(900.0, 700.0)
        .mousemove(true)
        .primitive(Primitive::Points)
        .vertex(VERTEX)
        .uniform("speed", 1.5f32)
        .uniform("radius", RADIUS)
        .buffer("position", 3, positions)
        .buffer("color", 4, colors)
        .on_resize(|shader: &mut Shader, width, height, dpi| {
            log::info!("viewport {width}x{height} @ {dpi}x, {} points", shader.count());
        })
        .on_update(move |_shader: &mut Shader, dt| {
            if let Some(avg) = stats.record(dt) {
                log::debug!(
                    "avg frame {:.2} ms ({:.0} fps)",
                    avg.as_secs_f64() * 1000.0,
                    1.0 / avg.as_secs_f64().max(f64::EPSILON)
                );
            }
        });

    if let Some(path) = std::env::args().nth(1) {
        log::info!("texture: {path}");
        options = options.texture(path.as_str());
    }

    glint_shader::run(options).inspect_err(|err| log::error!("{err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_points_lie_on_the_radius() {
        let (positions, colors) = sphere(100, 10.0);
        assert_eq!(positions.len(), 300);
        assert_eq!(colors.len(), 400);

        for p in positions.chunks_exact(3) {
            let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((len - 10.0).abs() < 1e-3, "point at distance {len}");
        }
    }

    #[test]
    fn sphere_colors_are_in_range() {
        let (_, colors) = sphere(50, 1.0);
        assert!(colors.iter().all(|c| (0.0..=1.0).contains(c)));
    }

    #[test]
    fn vertex_stage_compiles_against_declared_uniforms() {
        use glint_shader::{AttributeBuffer, BufferSet, UniformSet, UniformValue, DEFAULT_FRAGMENT};

        let uniforms = UniformSet::with_defaults([
            ("speed", UniformValue::Float(1.0)),
            ("radius", UniformValue::Float(RADIUS)),
        ]);
        let buffers = BufferSet::with_defaults(Vec::<(String, AttributeBuffer)>::new()).unwrap();
        let source = glint_shader::assemble(&uniforms, &buffers, VERTEX, DEFAULT_FRAGMENT);

        glint_shader::check(&source).unwrap();
    }

    #[test]
    fn frame_stats_report_once_per_window() {
        let mut stats = FrameStats::new(3);
        assert_eq!(stats.record(Duration::from_millis(10)), None);
        assert_eq!(stats.record(Duration::from_millis(20)), None);
        assert_eq!(
            stats.record(Duration::from_millis(30)),
            Some(Duration::from_millis(20))
        );
        assert_eq!(stats.record(Duration::from_millis(5)), None);
    }
}
