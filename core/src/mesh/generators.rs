//! Mesh generators for simple shapes.
//!
//! These generators produce [`MeshData`] values used as the default scene
//! when no model file is supplied.

use super::data::{MeshData, Vertex};

/// Generate a single triangle on the XY plane.
///
/// The triangle spans the given half-extent around the origin with one
/// corner color per vertex.
pub fn generate_triangle(half_extent: f32) -> MeshData {
    let vertices = vec![
        Vertex::new([0.0, half_extent, 0.0], [1.0, 0.0, 0.0]),
        Vertex::new([-half_extent, -half_extent, 0.0], [0.0, 1.0, 0.0]),
        Vertex::new([half_extent, -half_extent, 0.0], [0.0, 0.0, 1.0]),
    ];
    let indices = vec![0, 1, 2];

    MeshData::new(vertices, indices)
        .expect("generator indices are in bounds")
        .with_label("triangle")
}

/// Generate an axis-aligned cube centered at the origin.
///
/// Produces 8 shared corner vertices and 12 triangles. Each corner is
/// colored by its normalized position, which makes face orientation visible
/// without lighting.
pub fn generate_cube(half_extent: f32) -> MeshData {
    let h = half_extent;
    let corners = [
        [-h, -h, -h],
        [h, -h, -h],
        [h, h, -h],
        [-h, h, -h],
        [-h, -h, h],
        [h, -h, h],
        [h, h, h],
        [-h, h, h],
    ];

    let vertices: Vec<Vertex> = corners
        .iter()
        .map(|&p| {
            let color = [
                0.5 + 0.5 * (p[0] / h),
                0.5 + 0.5 * (p[1] / h),
                0.5 + 0.5 * (p[2] / h),
            ];
            Vertex::new(p, color)
        })
        .collect();

    let indices = vec![
        0, 1, 2, 2, 3, 0, // back
        5, 4, 7, 7, 6, 5, // front
        4, 0, 3, 3, 7, 4, // left
        1, 5, 6, 6, 2, 1, // right
        3, 2, 6, 6, 7, 3, // top
        4, 5, 1, 1, 0, 4, // bottom
    ];

    MeshData::new(vertices, indices)
        .expect("generator indices are in bounds")
        .with_label("cube")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_triangle() {
        let mesh = generate_triangle(0.5);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.label(), Some("triangle"));
    }

    #[test]
    fn test_generate_cube() {
        let mesh = generate_cube(0.5);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.index_count(), 36);
        assert_eq!(mesh.triangle_count(), 12);

        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, [-0.5, -0.5, -0.5]);
        assert_eq!(bounds.max, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_cube_indices_in_bounds() {
        let mesh = generate_cube(1.0);
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices().iter().all(|&i| i < count));
    }
}
