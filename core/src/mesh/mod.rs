//! CPU-side mesh data.
//!
//! This module provides:
//! - [`Vertex`] - Position + color vertex used by the viewer
//! - [`MeshData`] - CPU-side triangle mesh holding vertices and `u32` indices
//! - [`generators`] - Procedural meshes for the default scene

pub mod data;
pub mod generators;

pub use data::{Aabb, MeshData, MeshError, Vertex};
