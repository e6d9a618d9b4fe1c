//! Dummy GPU backend for testing and development.
//!
//! This backend performs no GPU work but provides a complete implementation
//! of the backend trait: it synthesizes a software adapter capability
//! snapshot and tracks buffer allocations and draw submissions, so
//! negotiation and resource binding behave observably without GPU hardware.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::caps::{
    AdapterCaps, AdapterType, ColorSpace, Extent2d, PresentMode, QueueCapabilities,
    QueueFamilyCaps, SurfaceCaps, SurfaceFormat, TextureFormat,
};
use crate::error::GraphicsError;
use crate::instance::{InstanceParameters, ValidationMode};
use crate::negotiate::SwapchainConfig;
use crate::types::BufferDescriptor;

use super::{DrawSubmission, GpuBackend, GpuBuffer};

/// Resource and submission counters exposed for tests.
#[derive(Debug, Default)]
pub struct BackendCounters {
    buffers_created: AtomicUsize,
    buffers_released: AtomicUsize,
    buffers_live: AtomicUsize,
    buffers_live_peak: AtomicUsize,
    bytes_written: AtomicU64,
    draws_submitted: AtomicUsize,
    frames_presented: AtomicUsize,
}

impl BackendCounters {
    fn note_buffer_created(&self) {
        self.buffers_created.fetch_add(1, Ordering::SeqCst);
        let live = self.buffers_live.fetch_add(1, Ordering::SeqCst) + 1;
        self.buffers_live_peak.fetch_max(live, Ordering::SeqCst);
    }

    pub(crate) fn note_buffer_released(&self) {
        self.buffers_released.fetch_add(1, Ordering::SeqCst);
        self.buffers_live.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of buffers created since backend creation.
    pub fn buffers_created(&self) -> usize {
        self.buffers_created.load(Ordering::SeqCst)
    }

    /// Number of buffers released since backend creation.
    pub fn buffers_released(&self) -> usize {
        self.buffers_released.load(Ordering::SeqCst)
    }

    /// Number of currently live buffers.
    pub fn buffers_live(&self) -> usize {
        self.buffers_live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live buffers observed.
    pub fn buffers_live_peak(&self) -> usize {
        self.buffers_live_peak.load(Ordering::SeqCst)
    }

    /// Total bytes written into buffers.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::SeqCst)
    }

    /// Number of indexed draws submitted.
    pub fn draws_submitted(&self) -> usize {
        self.draws_submitted.load(Ordering::SeqCst)
    }

    /// Number of frames presented.
    pub fn frames_presented(&self) -> usize {
        self.frames_presented.load(Ordering::SeqCst)
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    counters: Arc<BackendCounters>,
    swapchain: Mutex<Option<SwapchainConfig>>,
}

impl DummyBackend {
    /// Create a new dummy backend with default parameters.
    pub fn new() -> Self {
        Self {
            counters: Arc::new(BackendCounters::default()),
            swapchain: Mutex::new(None),
        }
    }

    /// Create a dummy backend, honoring the validation request.
    ///
    /// The dummy backend carries no validation layer, so
    /// [`ValidationMode::Required`] fails with
    /// [`GraphicsError::ValidationUnavailable`] while
    /// [`ValidationMode::Preferred`] degrades with a warning.
    pub fn with_params(params: &InstanceParameters) -> Result<Self, GraphicsError> {
        match params.validation {
            ValidationMode::Required => {
                return Err(GraphicsError::ValidationUnavailable);
            }
            ValidationMode::Preferred => {
                log::warn!("Validation requested but the dummy backend provides none");
            }
            ValidationMode::Disabled => {}
        }
        Ok(Self::new())
    }

    /// Get the shared counters.
    pub fn counters(&self) -> &Arc<BackendCounters> {
        &self.counters
    }

    /// Get the currently realized swapchain configuration, if any.
    pub fn realized_config(&self) -> Option<SwapchainConfig> {
        self.swapchain.lock().ok().and_then(|config| config.clone())
    }

    fn software_surface_caps() -> SurfaceCaps {
        SurfaceCaps {
            min_image_count: 2,
            max_image_count: 0,
            current_extent: None,
            min_extent: Extent2d::new(1, 1),
            max_extent: Extent2d::new(16384, 16384),
            formats: vec![
                SurfaceFormat {
                    format: TextureFormat::Bgra8Unorm,
                    color_space: ColorSpace::SrgbNonLinear,
                },
                SurfaceFormat {
                    format: TextureFormat::Bgra8UnormSrgb,
                    color_space: ColorSpace::SrgbNonLinear,
                },
            ],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
        }
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn adapter_caps(&self) -> Result<Vec<AdapterCaps>, GraphicsError> {
        // One software adapter. Family 0 is compute/transfer only so the
        // negotiation scan has to walk past it.
        Ok(vec![AdapterCaps {
            name: "Dummy Adapter".to_string(),
            adapter_type: AdapterType::Software,
            queue_families: vec![
                QueueFamilyCaps {
                    capabilities: QueueCapabilities::COMPUTE | QueueCapabilities::TRANSFER,
                    present_support: false,
                },
                QueueFamilyCaps {
                    capabilities: QueueCapabilities::GRAPHICS
                        | QueueCapabilities::COMPUTE
                        | QueueCapabilities::TRANSFER,
                    present_support: true,
                },
            ],
            extensions: crate::negotiate::REQUIRED_DEVICE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            surface: Self::software_surface_caps(),
        }])
    }

    fn surface_caps(&self, adapter_index: usize) -> Result<SurfaceCaps, GraphicsError> {
        if adapter_index != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "adapter index {adapter_index} out of range"
            )));
        }
        Ok(Self::software_surface_caps())
    }

    fn realize_swapchain(&self, config: &SwapchainConfig) -> Result<(), GraphicsError> {
        log::trace!(
            "DummyBackend: realizing swapchain {}x{} with {} images",
            config.extent.width,
            config.extent.height,
            config.image_count
        );
        if let Ok(mut swapchain) = self.swapchain.lock() {
            *swapchain = Some(config.clone());
        }
        Ok(())
    }

    fn release_swapchain(&self) {
        if let Ok(mut swapchain) = self.swapchain.lock() {
            *swapchain = None;
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        self.counters.note_buffer_created();
        Ok(GpuBuffer::Dummy {
            counters: Arc::clone(&self.counters),
            size: descriptor.size,
        })
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        if offset + data.len() as u64 > buffer.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                buffer.size()
            )));
        }
        self.counters
            .bytes_written
            .fetch_add(data.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    fn render_frame(
        &self,
        draw: Option<DrawSubmission<'_>>,
        _clear_color: [f32; 4],
    ) -> Result<(), GraphicsError> {
        if let Some(draw) = draw {
            log::trace!(
                "DummyBackend: indexed draw of {} indices",
                draw.index_count
            );
            self.counters.draws_submitted.fetch_add(1, Ordering::SeqCst);
        }
        self.counters
            .frames_presented
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiate::select_configuration;

    #[test]
    fn test_adapter_snapshot_negotiates() {
        let backend = DummyBackend::new();
        let adapters = backend.adapter_caps().unwrap();
        let config = select_configuration(&adapters, Extent2d::new(800, 600)).unwrap();

        // Family 0 is compute-only; the scan must land on family 1.
        assert_eq!(config.queue_family_index, 1);
        // The preferred format sits at position 1 of the reported list.
        assert_eq!(
            config.format.format,
            TextureFormat::Bgra8UnormSrgb
        );
        assert_eq!(config.present_mode, PresentMode::Mailbox);
        assert_eq!(config.image_count, 3);
        assert_eq!(config.extent, Extent2d::new(800, 600));
    }

    #[test]
    fn test_required_validation_fails() {
        let params = InstanceParameters::new().with_validation(ValidationMode::Required);
        let result = DummyBackend::with_params(&params);
        assert!(matches!(result, Err(GraphicsError::ValidationUnavailable)));
    }

    #[test]
    fn test_preferred_validation_degrades() {
        let params = InstanceParameters::new().with_validation(ValidationMode::Preferred);
        assert!(DummyBackend::with_params(&params).is_ok());
    }

    #[test]
    fn test_buffer_counters() {
        let backend = DummyBackend::new();
        let descriptor = BufferDescriptor::new(64, crate::types::BufferUsage::VERTEX);
        {
            let buffer = backend.create_buffer(&descriptor).unwrap();
            backend.write_buffer(&buffer, 0, &[0u8; 64]).unwrap();
            assert_eq!(backend.counters().buffers_live(), 1);
        }
        assert_eq!(backend.counters().buffers_created(), 1);
        assert_eq!(backend.counters().buffers_released(), 1);
        assert_eq!(backend.counters().buffers_live(), 0);
        assert_eq!(backend.counters().bytes_written(), 64);
    }

    #[test]
    fn test_write_out_of_bounds() {
        let backend = DummyBackend::new();
        let buffer = backend
            .create_buffer(&BufferDescriptor::new(16, crate::types::BufferUsage::VERTEX))
            .unwrap();
        let result = backend.write_buffer(&buffer, 8, &[0u8; 16]);
        assert!(result.is_err());
    }

    #[test]
    fn test_realize_and_release_swapchain() {
        let backend = DummyBackend::new();
        let adapters = backend.adapter_caps().unwrap();
        let config = select_configuration(&adapters, Extent2d::new(640, 480)).unwrap();

        backend.realize_swapchain(&config).unwrap();
        assert_eq!(backend.realized_config(), Some(config));

        backend.release_swapchain();
        assert_eq!(backend.realized_config(), None);
        // Safe to release twice.
        backend.release_swapchain();
    }
}
