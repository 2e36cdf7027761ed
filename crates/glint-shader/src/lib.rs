//! A small wrapper over wgpu for experimenting with shaders.
//!
//! One [`Shader`] owns one program: a vertex and fragment WGSL snippet, a set of named
//! uniforms, a set of named attribute buffers, an optional texture and a camera. The
//! wrapper generates the declarations both snippets share, keeps the built-in uniforms
//! (`time`, `resolution`, `mousemove`, `projection`, `has_texture`) current and draws
//! every frame.
//!
//! ```no_run
//! use glint_shader::{Primitive, ShaderOptions};
//!
//! let options = ShaderOptions::new()
//!     .title("triangle")
//!     .primitive(Primitive::Triangles)
//!     .buffer("position", 3, vec![-10.0, -10.0, 0.0, 10.0, -10.0, 0.0, 0.0, 10.0, 0.0])
//!     .buffer("color", 4, vec![1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
//!
//! glint_shader::run(options).unwrap();
//! ```

mod app;
mod buffer;
mod camera;
mod error;
mod options;
mod program;
mod shader;
mod texture;
mod uniform;

pub use app::{run, ShaderApp};
pub use buffer::{default_buffers, AttributeBuffer, BufferSet};
pub use camera::{orthographic, perspective, Camera};
pub use error::ShaderError;
pub use options::{
    Primitive, ResizeCallback, ShaderOptions, Side, UpdateCallback, DEFAULT_FRAGMENT,
    DEFAULT_VERTEX,
};
pub use program::{assemble, check, prelude, FRAGMENT_ENTRY, VERTEX_ENTRY};
pub use shader::{pointer_to_clip, Shader};
pub use texture::TextureSource;
pub use uniform::{default_uniforms, UniformSet, UniformType, UniformValue};
