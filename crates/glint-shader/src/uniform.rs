//! Named, typed uniforms packed into one uniform buffer.
//!
//! Every uniform becomes a member of a generated WGSL `struct Uniforms`, bound as `u`.
//! Offsets follow the WGSL uniform address-space layout rules so the packed bytes can be
//! written to the buffer as-is.

use std::fmt;

use crate::error::ShaderError;

/// The type of a uniform, named after its GLSL spelling.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformType {
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl UniformType {
    /// WGSL type used in the generated struct.
    pub fn wgsl(self) -> &'static str {
        match self {
            UniformType::Int => "i32",
            UniformType::Float => "f32",
            UniformType::Vec2 => "vec2<f32>",
            UniformType::Vec3 => "vec3<f32>",
            UniformType::Vec4 => "vec4<f32>",
            UniformType::Mat2 => "mat2x2<f32>",
            UniformType::Mat3 => "mat3x3<f32>",
            UniformType::Mat4 => "mat4x4<f32>",
        }
    }

    /// Required alignment in the uniform address space, in bytes.
    pub fn align(self) -> usize {
        match self {
            UniformType::Int | UniformType::Float => 4,
            UniformType::Vec2 | UniformType::Mat2 => 8,
            UniformType::Vec3 | UniformType::Vec4 | UniformType::Mat3 | UniformType::Mat4 => 16,
        }
    }

    /// Size in bytes, including the column padding of `mat3x3`.
    pub fn size(self) -> usize {
        match self {
            UniformType::Int | UniformType::Float => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 | UniformType::Mat2 => 16,
            UniformType::Mat3 => 48,
            UniformType::Mat4 => 64,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformType::Int => "int",
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
            UniformType::Vec3 => "vec3",
            UniformType::Vec4 => "vec4",
            UniformType::Mat2 => "mat2",
            UniformType::Mat3 => "mat3",
            UniformType::Mat4 => "mat4",
        };
        f.write_str(name)
    }
}

/// A uniform value. Matrices are column-major.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

pub(crate) const IDENTITY4: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat2(_) => UniformType::Mat2,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Writes the value at the start of `out`, which must be `ty().size()` bytes long.
    fn write(&self, out: &mut [u8]) {
        match self {
            UniformValue::Int(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Float(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec2(v) => out.copy_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Vec3(v) => out.copy_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Vec4(v) | UniformValue::Mat2(v) => {
                out.copy_from_slice(bytemuck::cast_slice(v))
            }
            UniformValue::Mat3(m) => {
                // Each vec3 column occupies 16 bytes.
                for (col, chunk) in m.chunks_exact(3).zip(out.chunks_exact_mut(16)) {
                    chunk[..12].copy_from_slice(bytemuck::cast_slice(col));
                    chunk[12..].fill(0);
                }
            }
            UniformValue::Mat4(v) => out.copy_from_slice(bytemuck::cast_slice(v)),
        }
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

/// Four floats are a `vec4`; use `UniformValue::Mat2` explicitly for a 2x2 matrix.
impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<[f32; 9]> for UniformValue {
    fn from(v: [f32; 9]) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<[f32; 16]> for UniformValue {
    fn from(v: [f32; 16]) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Uniforms every shader gets, in declaration order. User declarations with the same
/// name replace the value (and type) in place.
pub fn default_uniforms() -> Vec<(String, UniformValue)> {
    vec![
        ("time".to_string(), UniformValue::Float(0.0)),
        ("has_texture".to_string(), UniformValue::Int(0)),
        ("resolution".to_string(), UniformValue::Vec2([0.0, 0.0])),
        ("mousemove".to_string(), UniformValue::Vec2([0.0, 0.0])),
        ("projection".to_string(), UniformValue::Mat4(IDENTITY4)),
    ]
}

#[derive(Debug, Clone)]
struct UniformEntry {
    name: String,
    value: UniformValue,
    offset: usize,
}

/// The uniform set of one program: values, layout and dirty tracking.
#[derive(Debug, Clone)]
pub struct UniformSet {
    entries: Vec<UniformEntry>,
    size: usize,
    dirty: bool,
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

impl UniformSet {
    /// Builds a set from declarations. A repeated name overrides the earlier entry
    /// without moving it.
    pub fn new<I, S>(decls: I) -> Self
    where
        I: IntoIterator<Item = (S, UniformValue)>,
        S: Into<String>,
    {
        let mut entries: Vec<UniformEntry> = Vec::new();
        for (name, value) in decls {
            let name = name.into();
            match entries.iter_mut().find(|e| e.name == name) {
                Some(existing) => existing.value = value,
                None => entries.push(UniformEntry {
                    name,
                    value,
                    offset: 0,
                }),
            }
        }

        let mut offset = 0;
        for entry in &mut entries {
            let ty = entry.value.ty();
            entry.offset = align_up(offset, ty.align());
            offset = entry.offset + ty.size();
        }

        Self {
            entries,
            // Struct alignment in the uniform address space is 16.
            size: align_up(offset.max(1), 16),
            dirty: true,
        }
    }

    /// Defaults merged with `user` declarations.
    pub fn with_defaults<I, S>(user: I) -> Self
    where
        I: IntoIterator<Item = (S, UniformValue)>,
        S: Into<String>,
    {
        let user = user.into_iter().map(|(n, v)| (n.into(), v));
        Self::new(default_uniforms().into_iter().chain(user))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.size as u64
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.value)
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.offset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, UniformValue)> {
        self.entries.iter().map(|e| (e.name.as_str(), e.value))
    }

    /// Sets a declared uniform. The value must have the declared type.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<(), ShaderError> {
        let value = value.into();
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_string()))?;

        let expected = entry.value.ty();
        if expected != value.ty() {
            return Err(ShaderError::UniformType {
                name: name.to_string(),
                expected,
                found: value.ty(),
            });
        }

        if entry.value != value {
            entry.value = value;
            self.dirty = true;
        }
        Ok(())
    }

    /// Like [`set`](Self::set) for values the wrapper maintains itself (time, resolution,
    /// ...). A user who redeclared one with another type keeps their value.
    pub(crate) fn set_builtin(&mut self, name: &str, value: UniformValue) {
        if let Err(err) = self.set(name, value) {
            log::trace!("skipping built-in uniform update: {err}");
        }
    }

    /// Packed buffer contents.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.size];
        for entry in &self.entries {
            let size = entry.value.ty().size();
            entry.value.write(&mut out[entry.offset..entry.offset + size]);
        }
        out
    }

    /// Returns whether values changed since the last call.
    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// The generated `struct Uniforms` declaration.
    pub fn wgsl_struct(&self) -> String {
        let mut src = String::from("struct Uniforms {\n");
        for entry in &self.entries {
            src.push_str(&format!("    {}: {},\n", entry.name, entry.value.ty().wgsl()));
        }
        src.push_str("}\n");
        src
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn default_layout_matches_wgsl_rules() {
        let set = UniformSet::with_defaults(Vec::<(String, UniformValue)>::new());

        assert_eq!(set.offset_of("time"), Some(0));
        assert_eq!(set.offset_of("has_texture"), Some(4));
        assert_eq!(set.offset_of("resolution"), Some(8));
        assert_eq!(set.offset_of("mousemove"), Some(16));
        // mat4 aligns to 16, skipping 24..32.
        assert_eq!(set.offset_of("projection"), Some(32));
        assert_eq!(set.size(), 96);
    }

    #[test]
    fn vec3_leaves_room_for_a_scalar() {
        let set = UniformSet::new([
            ("dir", UniformValue::Vec3([1.0, 2.0, 3.0])),
            ("len", UniformValue::Float(4.0)),
        ]);
        assert_eq!(set.offset_of("len"), Some(12));
        assert_eq!(set.size(), 16);

        assert_eq!(floats(&set.bytes()), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn mat3_columns_are_padded() {
        let set = UniformSet::new([(
            "m",
            UniformValue::Mat3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]),
        )]);
        assert_eq!(set.size(), 48);

        assert_eq!(
            floats(&set.bytes()),
            vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]
        );
    }

    #[test]
    fn user_declaration_overrides_default_in_place() {
        let set = UniformSet::with_defaults([("time", UniformValue::Float(2.5))]);
        assert_eq!(set.len(), 5);
        assert_eq!(set.offset_of("time"), Some(0));
        assert_eq!(set.get("time"), Some(UniformValue::Float(2.5)));
    }

    #[test]
    fn user_uniforms_follow_defaults() {
        let set = UniformSet::with_defaults([("tint", UniformValue::Vec4([1.0; 4]))]);
        assert_eq!(set.offset_of("tint"), Some(96));
        assert_eq!(set.size(), 112);
    }

    #[test]
    fn set_rejects_unknown_name() {
        let mut set = UniformSet::with_defaults(Vec::<(String, UniformValue)>::new());
        let err = set.set("speed", 1.0f32).unwrap_err();
        assert!(matches!(err, ShaderError::UnknownUniform(name) if name == "speed"));
    }

    #[test]
    fn set_rejects_type_mismatch() {
        let mut set = UniformSet::with_defaults(Vec::<(String, UniformValue)>::new());
        let err = set.set("time", [1.0f32, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::UniformType {
                expected: UniformType::Float,
                found: UniformType::Vec2,
                ..
            }
        ));
        assert_eq!(set.get("time"), Some(UniformValue::Float(0.0)));
    }

    #[test]
    fn set_marks_dirty_only_on_change() {
        let mut set = UniformSet::with_defaults(Vec::<(String, UniformValue)>::new());
        assert!(set.take_dirty());
        assert!(!set.take_dirty());

        set.set("time", 0.0f32).unwrap();
        assert!(!set.take_dirty());

        set.set("time", 0.5f32).unwrap();
        assert!(set.take_dirty());
    }

    #[test]
    fn builtin_update_keeps_redeclared_type() {
        let mut set = UniformSet::with_defaults([("time", UniformValue::Int(7))]);
        set.set_builtin("time", UniformValue::Float(1.0));
        assert_eq!(set.get("time"), Some(UniformValue::Int(7)));
    }

    #[test]
    fn bytes_place_values_at_offsets() {
        let mut set = UniformSet::with_defaults(Vec::<(String, UniformValue)>::new());
        set.set("has_texture", 1).unwrap();
        set.set("resolution", [640.0f32, 480.0]).unwrap();

        let bytes = set.bytes();
        assert_eq!(&bytes[4..8], &1i32.to_le_bytes());
        assert_eq!(floats(&bytes[8..16]), vec![640.0, 480.0]);
        assert_eq!(floats(&bytes[32..96]), IDENTITY4.to_vec());
    }

    #[test]
    fn wgsl_struct_lists_members_in_order() {
        let set = UniformSet::new([
            ("time", UniformValue::Float(0.0)),
            ("view", UniformValue::Mat4(IDENTITY4)),
        ]);
        assert_eq!(
            set.wgsl_struct(),
            "struct Uniforms {\n    time: f32,\n    view: mat4x4<f32>,\n}\n"
        );
    }
}
