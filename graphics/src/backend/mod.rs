//! GPU backend abstraction layer.
//!
//! Each backend implements the [`GpuBackend`] trait: capability snapshot
//! queries, realization of a negotiated [`SwapchainConfig`], buffer creation
//! and upload, and frame submission.
//!
//! # Available Backends
//!
//! - `dummy` (default): no GPU, tracks resource and draw counts for headless
//!   tests
//! - `vulkan-backend`: native Vulkan via ash
//! - `wgpu-backend`: cross-platform via wgpu; also provides the OpenGL path
//!   through wgpu's GL backend

#[cfg(feature = "dummy")]
pub mod dummy;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_impl;

use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

#[cfg(feature = "vulkan-backend")]
use ash::vk;
#[cfg(feature = "vulkan-backend")]
use gpu_allocator::vulkan::Allocation;
#[cfg(feature = "vulkan-backend")]
use parking_lot::Mutex;

use crate::caps::{AdapterCaps, SurfaceCaps};
use crate::error::GraphicsError;
use crate::instance::{BackendType, InstanceParameters};
use crate::negotiate::SwapchainConfig;
use crate::types::BufferDescriptor;

/// Unlit vertex-color shader shared by the real backends.
///
/// The Vulkan backend compiles it to SPIR-V through naga; the wgpu backend
/// consumes the WGSL directly.
#[cfg(any(feature = "wgpu-backend", feature = "vulkan-backend"))]
pub(crate) const UNLIT_WGSL: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 1.0);
    out.color = in.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#;

/// Handle to a GPU buffer resource.
pub enum GpuBuffer {
    /// Dummy backend (no GPU allocation).
    #[cfg(feature = "dummy")]
    Dummy {
        /// Shared counters of the owning backend.
        counters: Arc<dummy::BackendCounters>,
        /// Size in bytes.
        size: u64,
    },
    /// wgpu backend buffer.
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu::Buffer),
    /// Vulkan backend buffer.
    #[cfg(feature = "vulkan-backend")]
    Vulkan {
        /// Device handle for cleanup.
        device: ash::Device,
        /// Raw buffer handle.
        buffer: vk::Buffer,
        /// Backing allocation; taken on drop.
        allocation: Mutex<Option<Allocation>>,
        /// Size in bytes.
        size: u64,
    },
}

impl GpuBuffer {
    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        match self {
            #[cfg(feature = "dummy")]
            Self::Dummy { size, .. } => *size,
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(buffer) => buffer.size(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { size, .. } => *size,
        }
    }
}

impl std::fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "dummy")]
            Self::Dummy { size, .. } => {
                f.debug_struct("GpuBuffer::Dummy").field("size", size).finish()
            }
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(buffer) => f.debug_tuple("GpuBuffer::Wgpu").field(buffer).finish(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan { buffer, size, .. } => f
                .debug_struct("GpuBuffer::Vulkan")
                .field("buffer", buffer)
                .field("size", size)
                .finish_non_exhaustive(),
        }
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        match self {
            #[cfg(feature = "dummy")]
            Self::Dummy { counters, .. } => counters.note_buffer_released(),
            #[cfg(feature = "wgpu-backend")]
            Self::Wgpu(_) => {}
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan {
                device,
                buffer,
                allocation,
                ..
            } => {
                // The allocation's memory is returned to the allocator pool
                // when it drops.
                let _ = allocation.lock().take();
                unsafe {
                    device.destroy_buffer(*buffer, None);
                }
            }
        }
    }
}

/// An indexed draw request for one frame.
pub struct DrawSubmission<'a> {
    /// Vertex buffer holding [`Vertex`](stlview_core::mesh::Vertex) data.
    pub vertex_buffer: &'a GpuBuffer,
    /// Index buffer holding `u32` indices.
    pub index_buffer: &'a GpuBuffer,
    /// Number of indices to draw.
    pub index_count: u32,
}

/// GPU backend trait for abstracting different GPU APIs.
///
/// All operations are synchronous: every call either completes or fails
/// before returning, with no background work.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Query the capability snapshot of every adapter against the surface.
    ///
    /// Adapters are returned in the host driver's enumeration order, which
    /// negotiation relies on for deterministic selection.
    fn adapter_caps(&self) -> Result<Vec<AdapterCaps>, GraphicsError>;

    /// Re-query the surface capabilities of one adapter.
    ///
    /// Used for swapchain recreation after a resize.
    fn surface_caps(&self, adapter_index: usize) -> Result<SurfaceCaps, GraphicsError>;

    /// Realize a negotiated configuration into presentation resources.
    ///
    /// Any previously realized swapchain is fully released first.
    fn realize_swapchain(&self, config: &SwapchainConfig) -> Result<(), GraphicsError>;

    /// Release the presentation resources. Safe to call when none exist.
    fn release_swapchain(&self);

    /// Create a buffer resource.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError>;

    /// Write data to a buffer.
    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Render one frame: clear, optionally draw, present.
    fn render_frame(
        &self,
        draw: Option<DrawSubmission<'_>>,
        clear_color: [f32; 4],
    ) -> Result<(), GraphicsError>;
}

/// Create a backend according to the given parameters.
///
/// With [`BackendType::Auto`] the backends are tried in order — Vulkan,
/// wgpu, dummy — and the first one that initializes wins. An explicitly
/// requested backend is not substituted on failure.
///
/// Real backends need a window to present to; without one only the dummy
/// backend is available.
///
/// # Errors
///
/// Returns an error when the requested backend cannot be created, is not
/// compiled in, or — for [`ValidationMode::Required`] — when validation
/// layers are unavailable.
///
/// [`ValidationMode::Required`]: crate::instance::ValidationMode::Required
pub fn create_backend<W>(
    params: &InstanceParameters,
    window: Option<&W>,
) -> Result<Arc<dyn GpuBackend>, GraphicsError>
where
    W: HasWindowHandle + HasDisplayHandle + Sync,
{
    match params.backend {
        BackendType::Vulkan => {
            #[cfg(feature = "vulkan-backend")]
            {
                let window = window.ok_or_else(|| {
                    GraphicsError::InvalidParameter(
                        "vulkan backend requires a window".to_string(),
                    )
                })?;
                let backend = vulkan::VulkanBackend::with_params(params, window)?;
                return Ok(Arc::new(backend));
            }
            #[cfg(not(feature = "vulkan-backend"))]
            Err(GraphicsError::InitializationFailed(
                "vulkan backend not compiled in".to_string(),
            ))
        }
        BackendType::Wgpu | BackendType::Gl => {
            #[cfg(feature = "wgpu-backend")]
            {
                let window = window.ok_or_else(|| {
                    GraphicsError::InvalidParameter(
                        "wgpu backend requires a window".to_string(),
                    )
                })?;
                let backend = wgpu_impl::WgpuBackend::with_params(params, window)?;
                return Ok(Arc::new(backend));
            }
            #[cfg(not(feature = "wgpu-backend"))]
            Err(GraphicsError::InitializationFailed(
                "wgpu backend not compiled in".to_string(),
            ))
        }
        BackendType::Dummy => {
            #[cfg(feature = "dummy")]
            {
                let backend = dummy::DummyBackend::with_params(params)?;
                return Ok(Arc::new(backend));
            }
            #[cfg(not(feature = "dummy"))]
            Err(GraphicsError::InitializationFailed(
                "dummy backend not compiled in".to_string(),
            ))
        }
        BackendType::Auto => {
            #[cfg(feature = "vulkan-backend")]
            if let Some(window) = window {
                match vulkan::VulkanBackend::with_params(params, window) {
                    Ok(backend) => {
                        log::info!("Using Vulkan backend (ash)");
                        return Ok(Arc::new(backend));
                    }
                    Err(e) => {
                        log::warn!("Failed to create Vulkan backend: {}", e);
                    }
                }
            }

            #[cfg(feature = "wgpu-backend")]
            if let Some(window) = window {
                match wgpu_impl::WgpuBackend::with_params(params, window) {
                    Ok(backend) => {
                        log::info!("Using wgpu backend");
                        return Ok(Arc::new(backend));
                    }
                    Err(e) => {
                        log::warn!("Failed to create wgpu backend: {}", e);
                    }
                }
            }

            #[cfg(feature = "dummy")]
            {
                log::info!("Using dummy backend");
                let backend = dummy::DummyBackend::with_params(params)?;
                return Ok(Arc::new(backend));
            }
            #[cfg(not(feature = "dummy"))]
            Err(GraphicsError::InitializationFailed(
                "no backend available".to_string(),
            ))
        }
    }
}
