use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Interleaved vertex: position followed by color.
///
/// Shader locations: `0` = position, `1` = color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl ColorVertex {
    pub const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3  // color
    ];

    #[inline]
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColorVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Quad corners in NDC, each with its own color.
pub const QUAD_VERTICES: [ColorVertex; 4] = [
    ColorVertex::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0]),   // top right
    ColorVertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0]),  // bottom right
    ColorVertex::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0]), // bottom left
    ColorVertex::new([-0.5, 0.5, 0.0], [1.0, 0.0, 1.0]),  // top left
];

/// Two triangles sharing the top-left/bottom-right diagonal.
pub const QUAD_INDICES: [u16; 6] = [
    0, 1, 3, //
    1, 2, 3,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    NoVertices,

    #[error("mesh has no indices")]
    NoIndices,

    #[error("index count {0} is not a multiple of 3")]
    PartialTriangle(usize),

    #[error("{0} indices do not fit a single u32 draw range")]
    TooManyIndices(usize),

    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u16,
        vertex_count: usize,
    },
}

/// The exact arguments of one `draw_indexed` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDraw {
    pub indices: Range<u32>,
    pub base_vertex: i32,
    pub instances: Range<u32>,
}

impl IndexedDraw {
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.end - self.indices.start
    }
}

/// Borrowed CPU-side mesh: interleaved vertices plus a `u16` triangle list.
#[derive(Debug, Copy, Clone)]
pub struct Mesh<'a> {
    pub vertices: &'a [ColorVertex],
    pub indices: &'a [u16],
}

impl<'a> Mesh<'a> {
    #[inline]
    pub const fn new(vertices: &'a [ColorVertex], indices: &'a [u16]) -> Self {
        Self { vertices, indices }
    }

    /// The built-in colored quad.
    #[inline]
    pub const fn quad() -> Mesh<'static> {
        Mesh::new(&QUAD_VERTICES, &QUAD_INDICES)
    }

    /// Checks that the index list describes whole triangles over existing vertices.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        if self.indices.is_empty() {
            return Err(MeshError::NoIndices);
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::PartialTriangle(self.indices.len()));
        }
        draw_index_count(self.indices.len())?;

        let vertex_count = self.vertices.len();
        if let Some((position, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|&(_, &i)| usize::from(i) >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange {
                position,
                index,
                vertex_count,
            });
        }

        Ok(())
    }

    /// The single draw that covers every index of this mesh.
    pub fn indexed_draw(&self) -> Result<IndexedDraw, MeshError> {
        Ok(IndexedDraw {
            indices: 0..draw_index_count(self.indices.len())?,
            base_vertex: 0,
            instances: 0..1,
        })
    }
}

fn draw_index_count(len: usize) -> Result<u32, MeshError> {
    u32::try_from(len).map_err(|_| MeshError::TooManyIndices(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<ColorVertex>(), 24);
        assert_eq!(ColorVertex::layout().array_stride, 24);
    }

    #[test]
    fn attributes_use_distinct_locations_and_offsets() {
        let [position, color] = ColorVertex::ATTRS;
        assert_eq!((position.shader_location, position.offset), (0, 0));
        assert_eq!((color.shader_location, color.offset), (1, 12));
        assert_eq!(position.format, wgpu::VertexFormat::Float32x3);
        assert_eq!(color.format, wgpu::VertexFormat::Float32x3);
    }

    #[test]
    fn quad_bytes_match_interleaved_floats() {
        let floats: &[f32] = bytemuck::cast_slice(&QUAD_VERTICES);
        assert_eq!(floats.len(), 4 * 6);
        assert_eq!(&floats[..6], &[0.5, 0.5, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(&floats[18..], &[-0.5, 0.5, 0.0, 1.0, 0.0, 1.0]);
    }

    // ── validation ────────────────────────────────────────────────────────

    #[test]
    fn quad_is_valid() {
        let quad = Mesh::quad();
        assert_eq!(quad.validate(), Ok(()));
    }

    #[test]
    fn rejects_partial_triangle() {
        let mesh = Mesh::new(&QUAD_VERTICES, &[0, 1, 2, 3]);
        assert_eq!(mesh.validate(), Err(MeshError::PartialTriangle(4)));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let mesh = Mesh::new(&QUAD_VERTICES, &[0, 1, 4]);
        assert_eq!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange {
                position: 2,
                index: 4,
                vertex_count: 4
            })
        );
    }

    #[test]
    fn rejects_empty_mesh() {
        assert_eq!(Mesh::new(&[], &[]).validate(), Err(MeshError::NoVertices));
        assert_eq!(Mesh::new(&QUAD_VERTICES, &[]).validate(), Err(MeshError::NoIndices));
    }

    // ── draw range ────────────────────────────────────────────────────────

    #[test]
    fn quad_draws_exactly_six_indices_once() {
        let draw = Mesh::quad().indexed_draw().unwrap();
        assert_eq!(draw.indices, 0..6);
        assert_eq!(draw.index_count(), 6);
        assert_eq!(draw.instances, 0..1);
        assert_eq!(draw.base_vertex, 0);
    }

    #[test]
    fn index_count_beyond_u32_is_rejected_not_truncated() {
        assert_eq!(draw_index_count(6), Ok(6));
        assert_eq!(draw_index_count(u32::MAX as usize), Ok(u32::MAX));

        // 2^32 + 6 would wrap to a six-index draw with `as u32`.
        let Some(len) = (u32::MAX as usize).checked_add(7) else {
            return; // 32-bit targets cannot hold a slice this long.
        };
        assert_eq!(draw_index_count(len), Err(MeshError::TooManyIndices(len)));
    }
}
