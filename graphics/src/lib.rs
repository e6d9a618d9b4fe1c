//! # stlview Graphics
//!
//! Graphics device abstraction for the stlview viewer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`caps`] - Read-only capability snapshots of adapters and surfaces
//! - [`negotiate`] - Deterministic device/surface/swapchain negotiation
//! - [`SwapchainManager`] - Lifecycle of the negotiated configuration
//! - [`GpuMesh`] - Device-resident vertex/index buffers and draw submission
//! - [`backend`] - Vulkan, wgpu and dummy backends behind one trait
//!
//! ## Example
//!
//! ```ignore
//! let backend = create_backend(&InstanceParameters::new(), Some(&window))?;
//! let adapters = backend.adapter_caps()?;
//!
//! let mut swapchain = SwapchainManager::new();
//! let config = swapchain.configure(&adapters, Extent2d::new(800, 600))?;
//! backend.realize_swapchain(config)?;
//!
//! let mesh = GpuMesh::upload(backend.as_ref(), &mesh_data)?;
//! mesh.draw(backend.as_ref(), [0.1, 0.1, 0.1, 1.0])?;
//! ```

pub mod backend;
pub mod caps;
pub mod error;
pub mod instance;
pub mod mesh;
pub mod negotiate;
pub mod swapchain;
pub mod types;

// Re-export main types for convenience
pub use backend::{create_backend, DrawSubmission, GpuBackend, GpuBuffer};
pub use caps::{
    AdapterCaps, AdapterType, ColorSpace, Extent2d, PresentMode, QueueCapabilities,
    QueueFamilyCaps, SurfaceCaps, SurfaceFormat, TextureFormat,
};
pub use error::GraphicsError;
pub use instance::{BackendType, InstanceParameters, ValidationMode};
pub use mesh::GpuMesh;
pub use negotiate::{select_configuration, SwapchainConfig, REQUIRED_DEVICE_EXTENSIONS};
pub use swapchain::{SwapchainManager, SwapchainState};
pub use types::{BufferDescriptor, BufferUsage};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the graphics crate version on startup.
pub fn init() {
    log::info!("stlview Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
