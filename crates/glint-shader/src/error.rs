use crate::uniform::UniformType;

/// Errors raised while building or feeding a [`Shader`](crate::Shader).
#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    /// The assembled WGSL did not parse or validate. `log` holds the compiler output.
    #[error("failed to compile shader:\n{log}")]
    Compile { log: String },

    /// The stages compiled but do not form a valid pipeline: a missing entry point,
    /// mismatched vertex outputs and fragment inputs, or a rejected binding.
    #[error("failed to link program:\n{log}")]
    Link { log: String },

    #[error("no uniform named `{0}`")]
    UnknownUniform(String),

    #[error("uniform `{name}` is {expected}, got {found}")]
    UniformType {
        name: String,
        expected: UniformType,
        found: UniformType,
    },

    #[error("no attribute buffer named `{0}`")]
    UnknownBuffer(String),

    #[error("attribute buffer `{name}` holds {len} floats, not a multiple of its size {size}")]
    BufferLength { name: String, len: usize, size: u32 },

    #[error("attribute buffer `{name}` has size {size}; expected 1 to 4 components")]
    AttributeSize { name: String, size: u32 },

    #[error("texture is {width}x{height}; this device allows at most {max}x{max}")]
    TextureSize { width: u32, height: u32, max: u32 },

    #[error("failed to load texture: {0}")]
    Texture(#[from] image::ImageError),
}
