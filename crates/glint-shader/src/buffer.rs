//! Named per-vertex attribute buffers.
//!
//! Each buffer feeds one shader input of `size` float components. Buffers are bound in
//! declaration order: the n-th buffer is vertex-buffer slot n and `@location(n)` in the
//! generated `struct VertexInput`.

use crate::error::ShaderError;

/// Declaration of one attribute buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBuffer {
    /// Components per vertex, 1 to 4.
    pub size: u32,
    pub data: Vec<f32>,
}

impl AttributeBuffer {
    pub fn new(size: u32, data: Vec<f32>) -> Self {
        Self { size, data }
    }

    pub fn empty(size: u32) -> Self {
        Self::new(size, Vec::new())
    }
}

/// Buffers every shader gets: `position` (3 floats) and `color` (4 floats).
pub fn default_buffers() -> Vec<(String, AttributeBuffer)> {
    vec![
        ("position".to_string(), AttributeBuffer::empty(3)),
        ("color".to_string(), AttributeBuffer::empty(4)),
    ]
}

pub(crate) fn vertex_format(size: u32) -> Option<wgpu::VertexFormat> {
    match size {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

fn wgsl_type(size: u32) -> &'static str {
    match size {
        1 => "f32",
        2 => "vec2<f32>",
        3 => "vec3<f32>",
        _ => "vec4<f32>",
    }
}

#[derive(Debug, Clone)]
struct BufferEntry {
    name: String,
    buffer: AttributeBuffer,
    attribute: [wgpu::VertexAttribute; 1],
    dirty: bool,
}

/// The attribute buffers of one program, CPU side.
#[derive(Debug, Clone)]
pub struct BufferSet {
    entries: Vec<BufferEntry>,
}

impl BufferSet {
    /// Builds a set from declarations; a repeated name overrides the earlier entry in
    /// place. Every size must be 1..=4 and every data length a multiple of its size.
    pub fn new<I, S>(decls: I) -> Result<Self, ShaderError>
    where
        I: IntoIterator<Item = (S, AttributeBuffer)>,
        S: Into<String>,
    {
        let mut merged: Vec<(String, AttributeBuffer)> = Vec::new();
        for (name, buffer) in decls {
            let name = name.into();
            match merged.iter_mut().find(|(n, _)| *n == name) {
                Some((_, existing)) => *existing = buffer,
                None => merged.push((name, buffer)),
            }
        }

        let mut entries = Vec::with_capacity(merged.len());
        for (location, (name, buffer)) in merged.into_iter().enumerate() {
            let Some(format) = vertex_format(buffer.size) else {
                return Err(ShaderError::AttributeSize {
                    name,
                    size: buffer.size,
                });
            };
            check_length(&name, buffer.size, &buffer.data)?;

            entries.push(BufferEntry {
                name,
                buffer,
                attribute: [wgpu::VertexAttribute {
                    format,
                    offset: 0,
                    shader_location: location as u32,
                }],
                dirty: true,
            });
        }

        Ok(Self { entries })
    }

    /// Defaults merged with `user` declarations.
    pub fn with_defaults<I, S>(user: I) -> Result<Self, ShaderError>
    where
        I: IntoIterator<Item = (S, AttributeBuffer)>,
        S: Into<String>,
    {
        let user = user.into_iter().map(|(n, b)| (n.into(), b));
        Self::new(default_buffers().into_iter().chain(user))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeBuffer> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.buffer)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Replaces a buffer's data. Its length must be a multiple of the buffer's size.
    pub fn set(&mut self, name: &str, data: Vec<f32>) -> Result<(), ShaderError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| ShaderError::UnknownBuffer(name.to_string()))?;

        check_length(name, entry.buffer.size, &data)?;

        entry.buffer.data = data;
        entry.dirty = true;
        Ok(())
    }

    /// Vertices in the named buffer.
    pub fn vertex_count_of(&self, name: &str) -> Option<u32> {
        self.get(name)
            .map(|b| (b.data.len() / b.size as usize) as u32)
    }

    /// Vertices drawable from every buffer: the smallest count across the set.
    pub fn vertex_count(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| (e.buffer.data.len() / e.buffer.size as usize) as u32)
            .min()
            .unwrap_or(0)
    }

    /// Whether all buffers describe the same number of vertices.
    pub fn is_consistent(&self) -> bool {
        let mut counts = self
            .entries
            .iter()
            .map(|e| e.buffer.data.len() / e.buffer.size as usize);
        match counts.next() {
            Some(first) => counts.all(|c| c == first),
            None => true,
        }
    }

    /// Vertex-buffer layouts, one slot per buffer.
    pub fn layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.entries
            .iter()
            .map(|e| wgpu::VertexBufferLayout {
                array_stride: (e.buffer.size as usize * std::mem::size_of::<f32>()) as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &e.attribute,
            })
            .collect()
    }

    /// Calls `upload(slot, name, data)` for every buffer changed since the last call.
    pub(crate) fn drain_dirty(&mut self, mut upload: impl FnMut(usize, &str, &[f32])) {
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            if entry.dirty {
                upload(slot, &entry.name, &entry.buffer.data);
                entry.dirty = false;
            }
        }
    }

    /// The generated `struct VertexInput` declaration.
    pub fn wgsl_struct(&self) -> String {
        let mut src = String::from("struct VertexInput {\n");
        for entry in &self.entries {
            src.push_str(&format!(
                "    @location({}) {}: {},\n",
                entry.attribute[0].shader_location,
                entry.name,
                wgsl_type(entry.buffer.size)
            ));
        }
        src.push_str("}\n");
        src
    }
}

fn check_length(name: &str, size: u32, data: &[f32]) -> Result<(), ShaderError> {
    if data.len() % size as usize != 0 {
        return Err(ShaderError::BufferLength {
            name: name.to_string(),
            len: data.len(),
            size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> BufferSet {
        BufferSet::with_defaults(Vec::<(String, AttributeBuffer)>::new()).unwrap()
    }

    #[test]
    fn defaults_are_position_then_color() {
        let set = defaults();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["position", "color"]);
        assert_eq!(set.get("position").unwrap().size, 3);
        assert_eq!(set.get("color").unwrap().size, 4);
        assert_eq!(set.vertex_count(), 0);
    }

    #[test]
    fn vertex_count_is_length_over_size() {
        let mut set = defaults();
        set.set("position", vec![0.0; 9]).unwrap();
        set.set("color", vec![1.0; 12]).unwrap();

        assert_eq!(set.vertex_count_of("position"), Some(3));
        assert_eq!(set.vertex_count(), 3);
        assert!(set.is_consistent());
    }

    #[test]
    fn vertex_count_uses_shortest_buffer() {
        let mut set = defaults();
        set.set("position", vec![0.0; 12]).unwrap();
        set.set("color", vec![1.0; 8]).unwrap();

        assert_eq!(set.vertex_count(), 2);
        assert!(!set.is_consistent());
    }

    #[test]
    fn set_rejects_partial_vertex() {
        let mut set = defaults();
        let err = set.set("position", vec![0.0; 4]).unwrap_err();
        assert!(matches!(err, ShaderError::BufferLength { len: 4, size: 3, .. }));
        assert_eq!(set.get("position").unwrap().data.len(), 0);
    }

    #[test]
    fn set_rejects_unknown_buffer() {
        let mut set = defaults();
        let err = set.set("normal", vec![]).unwrap_err();
        assert!(matches!(err, ShaderError::UnknownBuffer(name) if name == "normal"));
    }

    #[test]
    fn declaration_size_out_of_range_is_rejected() {
        let err = BufferSet::new([("weights", AttributeBuffer::empty(5))]).unwrap_err();
        assert!(matches!(err, ShaderError::AttributeSize { size: 5, .. }));

        let err = BufferSet::new([("nothing", AttributeBuffer::empty(0))]).unwrap_err();
        assert!(matches!(err, ShaderError::AttributeSize { size: 0, .. }));
    }

    #[test]
    fn declaration_data_is_length_checked() {
        let err = BufferSet::new([("uv", AttributeBuffer::new(2, vec![0.0; 3]))]).unwrap_err();
        assert!(matches!(err, ShaderError::BufferLength { .. }));
    }

    #[test]
    fn override_keeps_location() {
        let set =
            BufferSet::with_defaults([("position", AttributeBuffer::new(2, vec![0.0; 4]))]).unwrap();
        let layouts = set.layouts();

        assert_eq!(layouts[0].array_stride, 8);
        assert_eq!(layouts[0].attributes[0].shader_location, 0);
        assert_eq!(layouts[0].attributes[0].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(layouts[1].attributes[0].shader_location, 1);
    }

    #[test]
    fn drain_dirty_reports_each_change_once() {
        let mut set = defaults();
        let mut seen = Vec::new();
        set.drain_dirty(|slot, name, _| seen.push((slot, name.to_string())));
        assert_eq!(seen.len(), 2);

        seen.clear();
        set.set("color", vec![0.5; 4]).unwrap();
        set.drain_dirty(|slot, name, data| seen.push((slot, format!("{name}:{}", data.len()))));
        assert_eq!(seen, vec![(1, "color:4".to_string())]);
    }

    #[test]
    fn wgsl_struct_assigns_locations() {
        let set = BufferSet::with_defaults([("size", AttributeBuffer::empty(1))]).unwrap();
        assert_eq!(
            set.wgsl_struct(),
            "struct VertexInput {\n    @location(0) position: vec3<f32>,\n    @location(1) color: vec4<f32>,\n    @location(2) size: f32,\n}\n"
        );
    }
}
