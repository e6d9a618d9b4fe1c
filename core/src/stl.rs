//! Binary STL decoding.
//!
//! Binary STL is a fixed-layout format: an 80-byte header (opaque, not
//! validated), a little-endian `u32` triangle count, then one 50-byte record
//! per triangle (12-byte normal, three 12-byte vertex positions, 2-byte
//! attribute field). Normals and attributes are skipped; only positions are
//! decoded.
//!
//! The declared triangle count is trusted: trailing bytes after the last
//! record are ignored, and a stream that ends mid-record yields the
//! fully-read triangles instead of an error. All reads are bounds-checked so
//! a short stream can never over-read.

use std::path::Path;

use crate::mesh::MeshData;

/// Length of the opaque file header in bytes.
pub const HEADER_LEN: usize = 80;

/// Length of one triangle record in bytes (normal + 3 vertices + attribute).
const RECORD_LEN: usize = 50;

/// Color assigned to every decoded vertex; STL carries no color data.
const PLACEHOLDER_COLOR: [f32; 3] = [0.7, 0.7, 0.7];

/// Errors that can occur during STL decoding.
#[derive(Debug)]
pub enum StlError {
    /// Reading the file failed.
    Io(std::io::Error),
    /// The stream is too short to contain the header and triangle count.
    Header {
        /// Actual length of the stream in bytes.
        len: usize,
    },
}

impl std::fmt::Display for StlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read STL file: {e}"),
            Self::Header { len } => {
                write!(
                    f,
                    "stream of {len} bytes is too short for a binary STL header"
                )
            }
        }
    }
}

impl std::error::Error for StlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StlError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Load and decode a binary STL file.
///
/// # Errors
///
/// Returns [`StlError::Io`] if the file cannot be read, or
/// [`StlError::Header`] if the content is too short to be a binary STL.
pub fn load_stl(path: impl AsRef<Path>) -> Result<MeshData, StlError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let mesh = decode_stl_bytes(&bytes)?;
    log::info!(
        "Loaded {}: {} triangles",
        path.display(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Decode a binary STL byte stream into mesh data.
///
/// Every triangle contributes three fresh vertices with sequential indices;
/// no deduplication is performed, so `N` fully-read triangles always produce
/// exactly `3N` vertices and indices `0..3N`.
///
/// # Errors
///
/// Returns [`StlError::Header`] if the stream is shorter than the 84-byte
/// header + count prefix. A stream that ends mid-record is not an error:
/// decoding stops at the last complete record.
pub fn decode_stl_bytes(bytes: &[u8]) -> Result<MeshData, StlError> {
    if bytes.len() < HEADER_LEN + 4 {
        return Err(StlError::Header { len: bytes.len() });
    }

    // The 80-byte header is opaque and carries no magic number to validate.
    let declared = read_u32(bytes, HEADER_LEN) as usize;

    // Reserve for what the stream can actually hold; the declared count is
    // trusted for decoding but not for allocation.
    let available = (bytes.len() - HEADER_LEN - 4) / RECORD_LEN;
    let mut mesh = MeshData::with_capacity(declared.min(available));
    let mut offset = HEADER_LEN + 4;

    for _ in 0..declared {
        if offset + RECORD_LEN > bytes.len() {
            log::warn!(
                "STL stream truncated: {} of {} declared triangles present",
                mesh.triangle_count(),
                declared
            );
            break;
        }

        // Skip the 12-byte facet normal.
        let mut cursor = offset + 12;
        let mut positions = [[0.0f32; 3]; 3];
        for position in &mut positions {
            *position = [
                read_f32(bytes, cursor),
                read_f32(bytes, cursor + 4),
                read_f32(bytes, cursor + 8),
            ];
            cursor += 12;
        }

        mesh.push_triangle(positions, PLACEHOLDER_COLOR);

        // Skip the 2-byte attribute field.
        offset += RECORD_LEN;
    }

    Ok(mesh)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a binary STL stream declaring `declared` triangles and
    /// containing the given triangle positions.
    fn build_stl(declared: u32, triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes.extend_from_slice(&declared.to_le_bytes());
        for triangle in triangles {
            // Facet normal, skipped by the decoder.
            bytes.extend_from_slice(&[0u8; 12]);
            for vertex in triangle {
                for component in vertex {
                    bytes.extend_from_slice(&component.to_le_bytes());
                }
            }
            // Attribute byte count.
            bytes.extend_from_slice(&[0u8; 2]);
        }
        bytes
    }

    const TRI_A: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    const TRI_B: [[f32; 3]; 3] = [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]];

    #[test]
    fn test_decode_empty() {
        let bytes = build_stl(0, &[]);
        let mesh = decode_stl_bytes(&bytes).unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_decode_triangle_soup() {
        let bytes = build_stl(2, &[TRI_A, TRI_B]);
        let mesh = decode_stl_bytes(&bytes).unwrap();

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.vertices()[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices()[3].position, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices()[5].position, [0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_decode_positions_little_endian() {
        let tri = [[1.5, -2.0, 3.25], [0.0, 0.5, -1.0], [4.0, 4.0, 4.0]];
        let bytes = build_stl(1, &[tri]);
        let mesh = decode_stl_bytes(&bytes).unwrap();
        assert_eq!(mesh.vertices()[0].position, [1.5, -2.0, 3.25]);
        assert_eq!(mesh.vertices()[1].position, [0.0, 0.5, -1.0]);
    }

    #[test]
    fn test_placeholder_color() {
        let bytes = build_stl(1, &[TRI_A]);
        let mesh = decode_stl_bytes(&bytes).unwrap();
        assert!(mesh.vertices().iter().all(|v| v.color == PLACEHOLDER_COLOR));
    }

    #[test]
    fn test_indices_always_in_bounds() {
        let bytes = build_stl(2, &[TRI_A, TRI_B]);
        let mesh = decode_stl_bytes(&bytes).unwrap();
        let count = mesh.vertex_count() as u32;
        assert!(mesh.indices().iter().all(|&i| i < count));
    }

    #[test]
    fn test_truncated_mid_record() {
        let mut bytes = build_stl(2, &[TRI_A, TRI_B]);
        // Cut into the middle of the second record.
        bytes.truncate(HEADER_LEN + 4 + RECORD_LEN + 20);
        let mesh = decode_stl_bytes(&bytes).unwrap();

        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_declared_count_exceeds_data() {
        // Declares 100 triangles but carries only one record.
        let bytes = build_stl(100, &[TRI_A]);
        let mesh = decode_stl_bytes(&bytes).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = build_stl(1, &[TRI_A]);
        bytes.extend_from_slice(&[0xAB; 37]);
        let mesh = decode_stl_bytes(&bytes).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_short_stream_is_header_error() {
        let result = decode_stl_bytes(&[0u8; 40]);
        assert!(matches!(result, Err(StlError::Header { len: 40 })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_stl("/nonexistent/model.stl");
        assert!(matches!(result, Err(StlError::Io(_))));
    }
}
