//! Swapchain configuration lifecycle.
//!
//! The [`SwapchainManager`] owns the negotiated [`SwapchainConfig`] and
//! tracks its lifecycle: `Uninitialized → Configured → Stale → Configured →
//! Destroyed`. It is pure over capability snapshots; a backend realizes the
//! chosen configuration into native presentation resources.
//!
//! A `Stale` transition is triggered externally through
//! [`SwapchainManager::note_extent`] whenever the presentation surface's
//! reported size diverges from the configured extent (window resize).
//! Recreation re-runs the format/present-mode/extent/image-count selection
//! against fresh surface capabilities while keeping the originally selected
//! adapter and queue family fixed.

use crate::caps::{AdapterCaps, Extent2d, SurfaceCaps};
use crate::error::GraphicsError;
use crate::negotiate::{
    self, choose_extent, choose_image_count, choose_present_mode, choose_surface_format,
    SwapchainConfig,
};

/// Lifecycle state of the swapchain configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapchainState {
    /// No configuration has been negotiated yet.
    #[default]
    Uninitialized,
    /// A configuration is active.
    Configured,
    /// The surface extent diverged from the configuration; recreation needed.
    Stale,
    /// The configuration has been released. Terminal.
    Destroyed,
}

/// Owns the negotiated swapchain configuration.
///
/// The configuration is replaced wholesale on every transition, never
/// patched field by field, and has exactly one owner.
#[derive(Debug, Default)]
pub struct SwapchainManager {
    state: SwapchainState,
    config: Option<SwapchainConfig>,
}

impl SwapchainManager {
    /// Create a manager in the `Uninitialized` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> SwapchainState {
        self.state
    }

    /// Get the active configuration, if any.
    pub fn config(&self) -> Option<&SwapchainConfig> {
        self.config.as_ref()
    }

    /// Check whether the configuration needs recreation.
    pub fn is_stale(&self) -> bool {
        self.state == SwapchainState::Stale
    }

    /// Run full device negotiation and adopt the resulting configuration.
    ///
    /// # Errors
    ///
    /// Propagates negotiation failures; additionally fails with
    /// [`GraphicsError::InvalidParameter`] when called after [`destroy`].
    /// On error no state is mutated.
    ///
    /// [`destroy`]: SwapchainManager::destroy
    pub fn configure(
        &mut self,
        adapters: &[AdapterCaps],
        requested: Extent2d,
    ) -> Result<&SwapchainConfig, GraphicsError> {
        if self.state == SwapchainState::Destroyed {
            return Err(GraphicsError::InvalidParameter(
                "swapchain manager has been destroyed".to_string(),
            ));
        }

        let config = negotiate::select_configuration(adapters, requested)?;
        self.config = Some(config);
        self.state = SwapchainState::Configured;
        Ok(self.config.as_ref().expect("configuration just stored"))
    }

    /// Record the extent the surface currently reports.
    ///
    /// Marks the configuration stale when the reported size diverges from
    /// the configured extent. Has no effect in any other state.
    pub fn note_extent(&mut self, width: u32, height: u32) {
        if self.state != SwapchainState::Configured {
            return;
        }
        if let Some(config) = &self.config {
            if config.extent != Extent2d::new(width, height) {
                log::debug!(
                    "Surface extent {}x{} diverged from configured {}x{}, marking stale",
                    width,
                    height,
                    config.extent.width,
                    config.extent.height
                );
                self.state = SwapchainState::Stale;
            }
        }
    }

    /// Recreate the configuration against fresh surface capabilities.
    ///
    /// Keeps the previously selected adapter and queue family and re-runs
    /// the format, present mode, extent and image count selection. On an
    /// unchanged format and present-mode list the original choices are
    /// reproduced, so a pure resize only updates the extent-dependent
    /// fields.
    ///
    /// # Errors
    ///
    /// Fails with [`GraphicsError::InvalidParameter`] when no configuration
    /// is active or the fresh capabilities report no formats.
    pub fn recreate(
        &mut self,
        surface: &SurfaceCaps,
        requested: Extent2d,
    ) -> Result<&SwapchainConfig, GraphicsError> {
        let previous = match (&self.state, &self.config) {
            (SwapchainState::Configured | SwapchainState::Stale, Some(config)) => config,
            _ => {
                return Err(GraphicsError::InvalidParameter(
                    "no active swapchain configuration to recreate".to_string(),
                ));
            }
        };

        let Some(format) = choose_surface_format(&surface.formats) else {
            return Err(GraphicsError::InvalidParameter(
                "surface reports no formats".to_string(),
            ));
        };

        let config = SwapchainConfig {
            adapter_index: previous.adapter_index,
            queue_family_index: previous.queue_family_index,
            format,
            present_mode: choose_present_mode(&surface.present_modes),
            extent: choose_extent(surface, requested),
            image_count: choose_image_count(surface),
        };

        log::info!(
            "Recreated swapchain configuration: {}x{}, {} images",
            config.extent.width,
            config.extent.height,
            config.image_count
        );

        self.config = Some(config);
        self.state = SwapchainState::Configured;
        Ok(self.config.as_ref().expect("configuration just stored"))
    }

    /// Release the configuration. Terminal and safe to call in any state,
    /// including `Uninitialized`.
    pub fn destroy(&mut self) {
        if self.state == SwapchainState::Destroyed {
            return;
        }
        self.config = None;
        self.state = SwapchainState::Destroyed;
    }
}

// Plain snapshot data, safe to hand across threads.
static_assertions::assert_impl_all!(SwapchainManager: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{
        AdapterType, ColorSpace, PresentMode, QueueCapabilities, QueueFamilyCaps,
        SurfaceFormat, TextureFormat,
    };
    use crate::negotiate::REQUIRED_DEVICE_EXTENSIONS;

    fn surface_caps() -> SurfaceCaps {
        SurfaceCaps {
            min_image_count: 2,
            max_image_count: 0,
            current_extent: None,
            min_extent: Extent2d::new(1, 1),
            max_extent: Extent2d::new(4096, 4096),
            formats: vec![
                SurfaceFormat {
                    format: TextureFormat::Bgra8UnormSrgb,
                    color_space: ColorSpace::SrgbNonLinear,
                },
                SurfaceFormat {
                    format: TextureFormat::Rgba8Unorm,
                    color_space: ColorSpace::Linear,
                },
            ],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
        }
    }

    fn adapters() -> Vec<AdapterCaps> {
        vec![AdapterCaps {
            name: "Test Adapter".to_string(),
            adapter_type: AdapterType::Discrete,
            queue_families: vec![QueueFamilyCaps {
                capabilities: QueueCapabilities::GRAPHICS | QueueCapabilities::TRANSFER,
                present_support: true,
            }],
            extensions: REQUIRED_DEVICE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            surface: surface_caps(),
        }]
    }

    #[test]
    fn test_initial_state() {
        let manager = SwapchainManager::new();
        assert_eq!(manager.state(), SwapchainState::Uninitialized);
        assert!(manager.config().is_none());
    }

    #[test]
    fn test_configure() {
        let mut manager = SwapchainManager::new();
        let config = manager
            .configure(&adapters(), Extent2d::new(800, 600))
            .unwrap();
        assert_eq!(config.extent, Extent2d::new(800, 600));
        assert_eq!(manager.state(), SwapchainState::Configured);
    }

    #[test]
    fn test_failed_configure_mutates_nothing() {
        let mut manager = SwapchainManager::new();
        let result = manager.configure(&[], Extent2d::new(800, 600));
        assert!(result.is_err());
        assert_eq!(manager.state(), SwapchainState::Uninitialized);
        assert!(manager.config().is_none());
    }

    #[test]
    fn test_note_extent_same_size_stays_configured() {
        let mut manager = SwapchainManager::new();
        manager
            .configure(&adapters(), Extent2d::new(800, 600))
            .unwrap();
        manager.note_extent(800, 600);
        assert_eq!(manager.state(), SwapchainState::Configured);
    }

    #[test]
    fn test_note_extent_divergence_marks_stale() {
        let mut manager = SwapchainManager::new();
        manager
            .configure(&adapters(), Extent2d::new(800, 600))
            .unwrap();
        manager.note_extent(1024, 768);
        assert!(manager.is_stale());
    }

    #[test]
    fn test_recreate_preserves_device_selection() {
        let mut manager = SwapchainManager::new();
        let before = manager
            .configure(&adapters(), Extent2d::new(800, 600))
            .unwrap()
            .clone();

        manager.note_extent(1024, 768);
        let after = manager
            .recreate(&surface_caps(), Extent2d::new(1024, 768))
            .unwrap();

        assert_eq!(after.adapter_index, before.adapter_index);
        assert_eq!(after.queue_family_index, before.queue_family_index);
        assert_eq!(after.format, before.format);
        assert_eq!(after.present_mode, before.present_mode);
        assert_eq!(after.extent, Extent2d::new(1024, 768));
        assert_eq!(manager.state(), SwapchainState::Configured);
    }

    #[test]
    fn test_recreate_without_config_fails() {
        let mut manager = SwapchainManager::new();
        let result = manager.recreate(&surface_caps(), Extent2d::new(800, 600));
        assert!(result.is_err());
    }

    #[test]
    fn test_destroy_from_uninitialized() {
        let mut manager = SwapchainManager::new();
        manager.destroy();
        assert_eq!(manager.state(), SwapchainState::Destroyed);
        // Safe to call again.
        manager.destroy();
        assert_eq!(manager.state(), SwapchainState::Destroyed);
    }

    #[test]
    fn test_configure_after_destroy_fails() {
        let mut manager = SwapchainManager::new();
        manager.destroy();
        let result = manager.configure(&adapters(), Extent2d::new(800, 600));
        assert!(result.is_err());
    }

    #[test]
    fn test_note_extent_ignored_when_not_configured() {
        let mut manager = SwapchainManager::new();
        manager.note_extent(800, 600);
        assert_eq!(manager.state(), SwapchainState::Uninitialized);
    }
}
