//! Mesh data structures.
//!
//! A [`MeshData`] owns a flat vertex list and a `u32` index list describing a
//! triangle list. Two invariants hold for every constructed mesh:
//!
//! - every index is strictly less than the vertex count
//! - the index count is a multiple of three
//!
//! GPU-side buffers derived from a mesh are recreated wholesale when the mesh
//! is replaced; the mesh itself is never mutated after upload.

/// A single vertex with position and color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in model space.
    pub position: [f32; 3],
    /// Linear RGB color.
    pub color: [f32; 3],
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a new vertex.
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }
}

/// Errors that can occur when constructing mesh data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// An index references a vertex outside the vertex list.
    IndexOutOfRange {
        /// The offending index value.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },
    /// The index count is not a multiple of three.
    IncompleteTriangle {
        /// Number of indices in the mesh.
        index_count: usize,
    },
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange {
                index,
                vertex_count,
            } => {
                write!(
                    f,
                    "index {index} out of range for {vertex_count} vertices"
                )
            }
            Self::IncompleteTriangle { index_count } => {
                write!(
                    f,
                    "index count {index_count} is not a multiple of three"
                )
            }
        }
    }
}

impl std::error::Error for MeshError {}

/// Axis-aligned bounding box of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl Aabb {
    /// Get the extent of the box along each axis.
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// CPU-side triangle mesh.
///
/// Owns the vertex and index data. Constructed once, either from explicit
/// data via [`MeshData::new`] or by a decoder pushing triangles into a mesh
/// created with [`MeshData::with_capacity`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    label: Option<String>,
}

impl MeshData {
    /// Create a mesh from explicit vertex and index data.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IndexOutOfRange`] if any index references a
    /// vertex outside the list, or [`MeshError::IncompleteTriangle`] if the
    /// index count is not a multiple of three.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle {
                index_count: indices.len(),
            });
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }

        Ok(Self {
            vertices,
            indices,
            label: None,
        })
    }

    /// Create an empty mesh with capacity reserved for `triangles` triangles.
    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(triangles * 3),
            indices: Vec::with_capacity(triangles * 3),
            label: None,
        }
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append one triangle as three new vertices with sequential indices.
    ///
    /// No vertex deduplication is performed; the mesh grows by exactly three
    /// vertices and three indices per call.
    pub fn push_triangle(&mut self, positions: [[f32; 3]; 3], color: [f32; 3]) {
        for position in positions {
            self.indices.push(self.vertices.len() as u32);
            self.vertices.push(Vertex::new(position, color));
        }
    }

    /// Get the vertex list.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Get the index list.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Get the debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Get the number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check whether the mesh holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get the vertex data as raw bytes for buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get the index data as raw bytes for buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Compute the axis-aligned bounding box of the mesh.
    ///
    /// Returns `None` for a mesh with no vertices.
    pub fn bounds(&self) -> Option<Aabb> {
        let first = self.vertices.first()?;
        let mut min = first.position;
        let mut max = first.position;
        for vertex in &self.vertices[1..] {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex.position[axis]);
                max[axis] = max[axis].max(vertex.position[axis]);
            }
        }
        Some(Aabb { min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        let mesh = MeshData::new(vertices, vec![0, 1, 2]).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_new_index_out_of_range() {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            Vertex::new([1.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            Vertex::new([0.0, 1.0, 0.0], [1.0, 1.0, 1.0]),
        ];
        let result = MeshData::new(vertices, vec![0, 1, 3]);
        assert_eq!(
            result,
            Err(MeshError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn test_new_incomplete_triangle() {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
            Vertex::new([1.0, 0.0, 0.0], [1.0, 1.0, 1.0]),
        ];
        let result = MeshData::new(vertices, vec![0, 1]);
        assert_eq!(result, Err(MeshError::IncompleteTriangle { index_count: 2 }));
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = MeshData::new(Vec::new(), Vec::new()).unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.bounds(), None);
    }

    #[test]
    fn test_push_triangle() {
        let mut mesh = MeshData::with_capacity(2);
        mesh.push_triangle(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [0.5, 0.5, 0.5],
        );
        mesh.push_triangle(
            [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
            [0.5, 0.5, 0.5],
        );
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_vertex_bytes_size() {
        let mut mesh = MeshData::with_capacity(1);
        mesh.push_triangle(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [1.0, 1.0, 1.0],
        );
        assert_eq!(mesh.vertex_bytes().len(), 3 * Vertex::SIZE);
        assert_eq!(mesh.index_bytes().len(), 3 * std::mem::size_of::<u32>());
    }

    #[test]
    fn test_bounds() {
        let mut mesh = MeshData::with_capacity(1);
        mesh.push_triangle(
            [[-1.0, 0.0, 2.0], [1.0, -3.0, 0.0], [0.0, 1.0, -2.0]],
            [1.0, 1.0, 1.0],
        );
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, [-1.0, -3.0, -2.0]);
        assert_eq!(bounds.max, [1.0, 1.0, 2.0]);
        assert_eq!(bounds.size(), [2.0, 4.0, 4.0]);
    }
}
