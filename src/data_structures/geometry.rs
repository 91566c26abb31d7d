//! Vertex geometry shared by meshes.
//!
//! A [`Geometry`] is a set of named attribute buffers ("position", "color",
//! "normal", "texture", ...). Buffer names match the attribute names declared
//! by the programs, which is how a mesh knows where to upload each buffer.

use std::collections::BTreeMap;

use crate::pick::Aabb;

/// Tightly packed `f32` data for one vertex attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeBuffer {
    data: Vec<f32>,
    item_size: usize,
}

impl AttributeBuffer {
    /// `item_size` is the number of floats per vertex (1 to 4).
    ///
    /// Trailing floats that do not form a whole item are ignored when counting
    /// elements.
    pub fn new(data: Vec<f32>, item_size: usize) -> Self {
        Self {
            data,
            item_size: item_size.clamp(1, 4),
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of elements (vertices) stored in the buffer.
    pub fn len(&self) -> usize {
        self.data.len() / self.item_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn format(&self) -> wgpu::VertexFormat {
        match self.item_size {
            1 => wgpu::VertexFormat::Float32,
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    buffers: BTreeMap<String, AttributeBuffer>,
}

impl Geometry {
    pub const POSITION: &'static str = "position";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(mut self, name: &str, buffer: AttributeBuffer) -> Self {
        self.set_buffer(name, buffer);
        self
    }

    pub fn set_buffer(&mut self, name: &str, buffer: AttributeBuffer) {
        self.buffers.insert(name.to_string(), buffer);
    }

    pub fn buffer(&self, name: &str) -> Option<&AttributeBuffer> {
        self.buffers.get(name)
    }

    pub fn buffers(&self) -> impl Iterator<Item = (&str, &AttributeBuffer)> {
        self.buffers
            .iter()
            .map(|(name, buffer)| (name.as_str(), buffer))
    }

    /// Element count of the "position" buffer, which sizes non-indexed draws.
    pub fn vertex_count(&self) -> Option<usize> {
        self.buffer(Self::POSITION).map(AttributeBuffer::len)
    }

    /// Local-space bounds of a three component "position" buffer.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let positions = self.buffer(Self::POSITION)?;
        if positions.item_size() != 3 {
            return None;
        }
        Aabb::from_points(
            positions
                .data()
                .chunks_exact(3)
                .map(|p| cgmath::Point3::new(p[0], p[1], p[2])),
        )
    }
}
