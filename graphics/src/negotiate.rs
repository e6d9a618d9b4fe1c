//! Graphics device negotiation.
//!
//! [`select_configuration`] turns the capability snapshots of every adapter
//! on the system into a single [`SwapchainConfig`], or fails when no adapter
//! qualifies. Selection is first-match-wins over the host enumeration order,
//! so the result is stable and reproducible for a given snapshot.
//!
//! The per-field selection steps are standalone functions
//! ([`choose_surface_format`], [`choose_present_mode`], [`choose_extent`],
//! [`choose_image_count`]) so swapchain recreation can re-run them against
//! fresh surface capabilities while keeping the adapter and queue family
//! fixed.

use crate::caps::{
    AdapterCaps, ColorSpace, Extent2d, PresentMode, QueueCapabilities, SurfaceCaps,
    SurfaceFormat, TextureFormat,
};
use crate::error::GraphicsError;

/// Device extensions every selected adapter must expose.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&str] = &["VK_KHR_swapchain"];

/// The surface format preferred when the adapter offers it.
pub const PREFERRED_SURFACE_FORMAT: SurfaceFormat = SurfaceFormat {
    format: TextureFormat::Bgra8UnormSrgb,
    color_space: ColorSpace::SrgbNonLinear,
};

/// The negotiated swapchain configuration.
///
/// Produced by [`select_configuration`] and replaced wholesale whenever the
/// underlying surface capabilities change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainConfig {
    /// Index of the selected adapter in the enumeration order.
    pub adapter_index: usize,
    /// Index of the selected queue family on that adapter.
    pub queue_family_index: u32,
    /// Selected surface format.
    pub format: SurfaceFormat,
    /// Selected present mode.
    pub present_mode: PresentMode,
    /// Selected swapchain extent.
    pub extent: Extent2d,
    /// Number of swapchain images.
    pub image_count: u32,
}

/// Select a swapchain configuration from adapter capability snapshots.
///
/// The scan is a deliberate greedy policy: adapters are visited in the order
/// the host enumerated them and the first one with a qualifying queue family
/// and the required extensions wins. No scoring of discrete versus integrated
/// GPUs or of specialized queue families is performed, so multi-GPU systems
/// get a deterministic rather than an optimal pick.
///
/// # Errors
///
/// Returns [`GraphicsError::NoCompatibleDevice`] when no adapter exposes a
/// queue family with both graphics support and presentation to the surface.
/// Returns [`GraphicsError::MissingExtension`] when such a family exists but
/// every adapter carrying one lacks a required device extension, so callers
/// can report which constraint failed.
pub fn select_configuration(
    adapters: &[AdapterCaps],
    requested: Extent2d,
) -> Result<SwapchainConfig, GraphicsError> {
    let mut missing_extension: Option<&str> = None;

    for (adapter_index, adapter) in adapters.iter().enumerate() {
        let Some(queue_family_index) = find_queue_family(&adapter.queue_families) else {
            log::debug!(
                "Rejecting adapter {}: no graphics+present queue family",
                adapter.name
            );
            continue;
        };

        if let Some(name) = find_missing_extension(&adapter.extensions) {
            log::debug!(
                "Rejecting adapter {}: missing extension {}",
                adapter.name,
                name
            );
            missing_extension.get_or_insert(name);
            continue;
        }

        let Some(format) = choose_surface_format(&adapter.surface.formats) else {
            return Err(GraphicsError::InvalidParameter(
                "surface reports no formats".to_string(),
            ));
        };
        let present_mode = choose_present_mode(&adapter.surface.present_modes);
        let extent = choose_extent(&adapter.surface, requested);
        let image_count = choose_image_count(&adapter.surface);

        log::info!(
            "Selected adapter {} ({:?}): family {}, {:?} {:?}, {}x{}, {} images",
            adapter.name,
            adapter.adapter_type,
            queue_family_index,
            format.format,
            present_mode,
            extent.width,
            extent.height,
            image_count
        );

        return Ok(SwapchainConfig {
            adapter_index,
            queue_family_index,
            format,
            present_mode,
            extent,
            image_count,
        });
    }

    match missing_extension {
        Some(name) => Err(GraphicsError::MissingExtension(name.to_string())),
        None => Err(GraphicsError::NoCompatibleDevice),
    }
}

/// Find the first queue family supporting graphics and presentation.
fn find_queue_family(families: &[crate::caps::QueueFamilyCaps]) -> Option<u32> {
    families
        .iter()
        .position(|family| {
            family.capabilities.contains(QueueCapabilities::GRAPHICS)
                && family.present_support
        })
        .map(|index| index as u32)
}

/// Find a required extension the adapter does not expose, if any.
fn find_missing_extension(extensions: &[String]) -> Option<&'static str> {
    REQUIRED_DEVICE_EXTENSIONS
        .iter()
        .find(|required| !extensions.iter().any(|e| e == *required))
        .copied()
}

/// Choose a surface format from the reported list.
///
/// Prefers [`PREFERRED_SURFACE_FORMAT`] wherever it appears; otherwise falls
/// back to the first reported format. Returns `None` only when the list is
/// empty, which the platform contract rules out.
pub fn choose_surface_format(formats: &[SurfaceFormat]) -> Option<SurfaceFormat> {
    formats
        .iter()
        .find(|f| **f == PREFERRED_SURFACE_FORMAT)
        .or_else(|| formats.first())
        .copied()
}

/// Choose a present mode from the reported list.
///
/// Prefers low-latency [`PresentMode::Mailbox`] when offered; otherwise the
/// universally supported [`PresentMode::Fifo`].
pub fn choose_present_mode(modes: &[PresentMode]) -> PresentMode {
    if modes.contains(&PresentMode::Mailbox) {
        PresentMode::Mailbox
    } else {
        PresentMode::Fifo
    }
}

/// Choose the swapchain extent.
///
/// When the surface reports a defined current extent it is authoritative and
/// used verbatim. Only the undefined-extent sentinel hands control to the
/// caller-requested size, clamped component-wise into the supported range.
pub fn choose_extent(caps: &SurfaceCaps, requested: Extent2d) -> Extent2d {
    match caps.current_extent {
        Some(current) => current,
        None => requested.clamp(caps.min_extent, caps.max_extent),
    }
}

/// Choose the swapchain image count.
///
/// One more than the minimum for latency headroom, clamped down to the
/// maximum when the surface reports a bound (0 means unbounded).
pub fn choose_image_count(caps: &SurfaceCaps) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{AdapterType, QueueFamilyCaps};
    use rstest::rstest;

    fn surface_caps() -> SurfaceCaps {
        SurfaceCaps {
            min_image_count: 2,
            max_image_count: 0,
            current_extent: None,
            min_extent: Extent2d::new(1, 1),
            max_extent: Extent2d::new(4096, 4096),
            formats: vec![PREFERRED_SURFACE_FORMAT],
            present_modes: vec![PresentMode::Fifo],
        }
    }

    fn adapter(families: Vec<QueueFamilyCaps>, extensions: Vec<String>) -> AdapterCaps {
        AdapterCaps {
            name: "Test Adapter".to_string(),
            adapter_type: AdapterType::Unknown,
            queue_families: families,
            extensions,
            surface: surface_caps(),
        }
    }

    fn graphics_present_family() -> QueueFamilyCaps {
        QueueFamilyCaps {
            capabilities: QueueCapabilities::GRAPHICS
                | QueueCapabilities::COMPUTE
                | QueueCapabilities::TRANSFER,
            present_support: true,
        }
    }

    fn required_extensions() -> Vec<String> {
        REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_selects_first_qualifying_family() {
        let families = vec![
            QueueFamilyCaps {
                capabilities: QueueCapabilities::COMPUTE | QueueCapabilities::TRANSFER,
                present_support: false,
            },
            QueueFamilyCaps {
                capabilities: QueueCapabilities::GRAPHICS,
                present_support: false,
            },
            graphics_present_family(),
            graphics_present_family(),
        ];
        let adapters = vec![adapter(families, required_extensions())];

        let config = select_configuration(&adapters, Extent2d::new(800, 600)).unwrap();
        assert_eq!(config.adapter_index, 0);
        assert_eq!(config.queue_family_index, 2);
    }

    #[test]
    fn test_no_compatible_device() {
        // Presentation-only and graphics-only families never qualify.
        let families = vec![
            QueueFamilyCaps {
                capabilities: QueueCapabilities::TRANSFER,
                present_support: true,
            },
            QueueFamilyCaps {
                capabilities: QueueCapabilities::GRAPHICS,
                present_support: false,
            },
        ];
        let adapters = vec![adapter(families, required_extensions())];

        let result = select_configuration(&adapters, Extent2d::new(800, 600));
        assert_eq!(result, Err(GraphicsError::NoCompatibleDevice));
    }

    #[test]
    fn test_no_adapters() {
        let result = select_configuration(&[], Extent2d::new(800, 600));
        assert_eq!(result, Err(GraphicsError::NoCompatibleDevice));
    }

    #[test]
    fn test_missing_extension_reported_distinctly() {
        let adapters = vec![adapter(vec![graphics_present_family()], Vec::new())];

        let result = select_configuration(&adapters, Extent2d::new(800, 600));
        assert_eq!(
            result,
            Err(GraphicsError::MissingExtension(
                "VK_KHR_swapchain".to_string()
            ))
        );
    }

    #[test]
    fn test_skips_incompatible_adapter() {
        // First adapter lacks the extension, second qualifies fully.
        let rejected = adapter(vec![graphics_present_family()], Vec::new());
        let accepted = adapter(vec![graphics_present_family()], required_extensions());
        let adapters = vec![rejected, accepted];

        let config = select_configuration(&adapters, Extent2d::new(800, 600)).unwrap();
        assert_eq!(config.adapter_index, 1);
    }

    #[test]
    fn test_preferred_format_found_at_any_position() {
        let formats = vec![
            SurfaceFormat {
                format: TextureFormat::Rgba8Unorm,
                color_space: ColorSpace::Linear,
            },
            PREFERRED_SURFACE_FORMAT,
            SurfaceFormat {
                format: TextureFormat::Rgba16Float,
                color_space: ColorSpace::Linear,
            },
        ];
        assert_eq!(choose_surface_format(&formats), Some(PREFERRED_SURFACE_FORMAT));
    }

    #[test]
    fn test_format_falls_back_to_first() {
        let formats = vec![
            SurfaceFormat {
                format: TextureFormat::Rgba8Unorm,
                color_space: ColorSpace::Linear,
            },
            SurfaceFormat {
                format: TextureFormat::Rgba16Float,
                color_space: ColorSpace::Linear,
            },
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[0]));
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[rstest]
    #[case(vec![PresentMode::Fifo, PresentMode::Mailbox], PresentMode::Mailbox)]
    #[case(vec![PresentMode::Fifo, PresentMode::Immediate], PresentMode::Fifo)]
    #[case(vec![PresentMode::Fifo], PresentMode::Fifo)]
    fn test_present_mode_selection(
        #[case] offered: Vec<PresentMode>,
        #[case] expected: PresentMode,
    ) {
        assert_eq!(choose_present_mode(&offered), expected);
    }

    #[rstest]
    #[case(Extent2d::new(100, 100), Extent2d::new(200, 200))]
    #[case(Extent2d::new(3000, 1000), Extent2d::new(2000, 1000))]
    #[case(Extent2d::new(640, 480), Extent2d::new(640, 480))]
    fn test_undefined_extent_clamps_request(
        #[case] requested: Extent2d,
        #[case] expected: Extent2d,
    ) {
        let caps = SurfaceCaps {
            current_extent: None,
            min_extent: Extent2d::new(200, 200),
            max_extent: Extent2d::new(2000, 2000),
            ..surface_caps()
        };
        assert_eq!(choose_extent(&caps, requested), expected);
    }

    #[test]
    fn test_defined_extent_is_authoritative() {
        // A defined current extent wins even outside the requested size.
        let caps = SurfaceCaps {
            current_extent: Some(Extent2d::new(1024, 768)),
            ..surface_caps()
        };
        assert_eq!(
            choose_extent(&caps, Extent2d::new(100, 100)),
            Extent2d::new(1024, 768)
        );
    }

    #[rstest]
    #[case(2, 2, 2)]
    #[case(2, 0, 3)]
    #[case(3, 8, 4)]
    fn test_image_count(#[case] min: u32, #[case] max: u32, #[case] expected: u32) {
        let caps = SurfaceCaps {
            min_image_count: min,
            max_image_count: max,
            ..surface_caps()
        };
        assert_eq!(choose_image_count(&caps), expected);
    }
}
