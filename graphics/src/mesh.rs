//! GPU mesh resource binding.
//!
//! [`GpuMesh`] uploads a [`MeshData`] into device-resident vertex and index
//! buffers sized exactly to the data. The upload is static: the source mesh
//! is not expected to mutate afterwards, and binding a new mesh fully
//! releases the prior buffers before allocating replacements.

use stlview_core::mesh::MeshData;

use crate::backend::{DrawSubmission, GpuBackend, GpuBuffer};
use crate::error::GraphicsError;
use crate::types::{BufferDescriptor, BufferUsage};

/// Device-resident vertex and index buffers for one mesh.
pub struct GpuMesh {
    vertex_buffer: Option<GpuBuffer>,
    index_buffer: Option<GpuBuffer>,
    vertex_count: u32,
    index_count: u32,
}

impl GpuMesh {
    /// Upload mesh data into fresh device buffers.
    ///
    /// Buffers are sized exactly to the vertex and index data and written
    /// once. An empty mesh allocates nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidIndex`] when an index references a
    /// vertex outside the list, or a backend error when allocation or the
    /// upload fails.
    pub fn upload(backend: &dyn GpuBackend, data: &MeshData) -> Result<Self, GraphicsError> {
        let mut mesh = Self {
            vertex_buffer: None,
            index_buffer: None,
            vertex_count: 0,
            index_count: 0,
        };
        mesh.rebind(backend, data)?;
        Ok(mesh)
    }

    /// Replace the bound mesh data.
    ///
    /// Prior device storage is fully released before the new buffers are
    /// allocated; there is no growth in place.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`GpuMesh::upload`]. On error the mesh is left
    /// empty rather than holding stale buffers.
    pub fn rebind(
        &mut self,
        backend: &dyn GpuBackend,
        data: &MeshData,
    ) -> Result<(), GraphicsError> {
        validate_indices(data)?;

        // Release before allocating.
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.vertex_count = 0;
        self.index_count = 0;

        if data.is_empty() {
            log::debug!("Bound empty mesh; no buffers allocated");
            return Ok(());
        }

        let vertex_bytes = data.vertex_bytes();
        let vertex_buffer = backend.create_buffer(
            &BufferDescriptor::new(
                vertex_bytes.len() as u64,
                BufferUsage::VERTEX | BufferUsage::COPY_DST,
            )
            .with_label("mesh vertices"),
        )?;
        backend.write_buffer(&vertex_buffer, 0, vertex_bytes)?;

        let index_bytes = data.index_bytes();
        let index_buffer = backend.create_buffer(
            &BufferDescriptor::new(
                index_bytes.len() as u64,
                BufferUsage::INDEX | BufferUsage::COPY_DST,
            )
            .with_label("mesh indices"),
        )?;
        backend.write_buffer(&index_buffer, 0, index_bytes)?;

        log::debug!(
            "Uploaded mesh: {} vertices ({} bytes), {} indices",
            data.vertex_count(),
            vertex_bytes.len(),
            data.index_count()
        );

        self.vertex_buffer = Some(vertex_buffer);
        self.index_buffer = Some(index_buffer);
        self.vertex_count = data.vertex_count() as u32;
        self.index_count = data.index_count() as u32;
        Ok(())
    }

    /// Get the number of uploaded vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Get the number of uploaded indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Get the draw submission for this mesh, or `None` when empty.
    pub fn submission(&self) -> Option<DrawSubmission<'_>> {
        match (&self.vertex_buffer, &self.index_buffer) {
            (Some(vertex_buffer), Some(index_buffer)) if self.index_count > 0 => {
                Some(DrawSubmission {
                    vertex_buffer,
                    index_buffer,
                    index_count: self.index_count,
                })
            }
            _ => None,
        }
    }

    /// Render one frame drawing this mesh.
    ///
    /// An empty mesh still clears and presents, with no draw submitted.
    pub fn draw(
        &self,
        backend: &dyn GpuBackend,
        clear_color: [f32; 4],
    ) -> Result<(), GraphicsError> {
        backend.render_frame(self.submission(), clear_color)
    }
}

impl std::fmt::Debug for GpuMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuMesh")
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .finish()
    }
}

/// Check the index invariant at upload time.
fn validate_indices(data: &MeshData) -> Result<(), GraphicsError> {
    let vertex_count = data.vertex_count();
    if let Some(&index) = data.indices().iter().find(|&&i| i as usize >= vertex_count) {
        return Err(GraphicsError::InvalidIndex {
            index,
            vertex_count,
        });
    }
    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use stlview_core::mesh::{generators, Vertex};

    fn triangle_soup(triangles: usize) -> MeshData {
        let mut mesh = MeshData::with_capacity(triangles);
        for i in 0..triangles {
            let z = i as f32;
            mesh.push_triangle(
                [[0.0, 0.0, z], [1.0, 0.0, z], [0.0, 1.0, z]],
                [1.0, 1.0, 1.0],
            );
        }
        mesh
    }

    #[test]
    fn test_upload_exact_sizes() {
        let backend = DummyBackend::new();
        let data = triangle_soup(2);
        let mesh = GpuMesh::upload(&backend, &data).unwrap();

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(backend.counters().buffers_created(), 2);
        assert_eq!(
            backend.counters().bytes_written(),
            (6 * Vertex::SIZE + 6 * std::mem::size_of::<u32>()) as u64
        );
    }

    #[test]
    fn test_upload_empty_mesh_allocates_nothing() {
        let backend = DummyBackend::new();
        let mesh = GpuMesh::upload(&backend, &MeshData::default()).unwrap();
        assert_eq!(mesh.index_count(), 0);
        assert_eq!(backend.counters().buffers_created(), 0);
        assert!(mesh.submission().is_none());
    }

    #[test]
    fn test_draw_empty_mesh_submits_nothing() {
        let backend = DummyBackend::new();
        let mesh = GpuMesh::upload(&backend, &MeshData::default()).unwrap();
        mesh.draw(&backend, [0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(backend.counters().draws_submitted(), 0);
        assert_eq!(backend.counters().frames_presented(), 1);
    }

    #[test]
    fn test_draw_submits_once_per_frame() {
        let backend = DummyBackend::new();
        let mesh = GpuMesh::upload(&backend, &generators::generate_cube(0.5)).unwrap();
        mesh.draw(&backend, [0.0, 0.0, 0.0, 1.0]).unwrap();
        mesh.draw(&backend, [0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(backend.counters().draws_submitted(), 2);
    }

    #[test]
    fn test_rebind_releases_before_allocating() {
        let backend = DummyBackend::new();
        let mut mesh = GpuMesh::upload(&backend, &triangle_soup(1)).unwrap();
        assert_eq!(backend.counters().buffers_live(), 2);

        mesh.rebind(&backend, &triangle_soup(4)).unwrap();

        assert_eq!(backend.counters().buffers_created(), 4);
        assert_eq!(backend.counters().buffers_released(), 2);
        assert_eq!(backend.counters().buffers_live(), 2);
        // The old pair was gone before the new pair existed.
        assert_eq!(backend.counters().buffers_live_peak(), 2);
        assert_eq!(mesh.index_count(), 12);
    }

    #[test]
    fn test_decoded_meshes_pass_upload_validation() {
        let backend = DummyBackend::new();
        let data = generators::generate_triangle(0.5);
        let mesh = GpuMesh::upload(&backend, &data).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
    }
}
