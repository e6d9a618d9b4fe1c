//! Capability snapshot types.
//!
//! Device negotiation runs over plain read-only snapshots of what the host
//! graphics runtime reports: queue families, device extensions, surface
//! formats, present modes and extent bounds. Backends fill these in from
//! their native capability queries; the negotiation logic in
//! [`negotiate`](crate::negotiate) never touches a native API.
//!
//! A snapshot is queried once per negotiation and is not validated for
//! internal consistency beyond the checks the negotiator itself performs.

use bitflags::bitflags;

bitflags! {
    /// Capability flags advertised by a queue family.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QueueCapabilities: u32 {
        /// The family accepts graphics commands.
        const GRAPHICS = 1 << 0;
        /// The family accepts compute commands.
        const COMPUTE = 1 << 1;
        /// The family accepts transfer commands.
        const TRANSFER = 1 << 2;
    }
}

/// Capabilities of one queue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyCaps {
    /// Command categories the family accepts.
    pub capabilities: QueueCapabilities,
    /// Whether the family can present to the target surface.
    pub present_support: bool,
}

/// Texture formats the viewer can negotiate for a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit BGRA, linear.
    Bgra8Unorm,
    /// 8-bit BGRA, sRGB-encoded.
    Bgra8UnormSrgb,
    /// 8-bit RGBA, linear.
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB-encoded.
    Rgba8UnormSrgb,
    /// 16-bit float RGBA.
    Rgba16Float,
}

/// Color space of a surface format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Standard sRGB non-linear color space.
    SrgbNonLinear,
    /// Linear color space.
    Linear,
}

/// A (format, color space) pair reported by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    /// Pixel format of the swapchain images.
    pub format: TextureFormat,
    /// Color space the presentation engine interprets them in.
    pub color_space: ColorSpace,
}

/// Presentation mode for the swapchain.
///
/// Controls how frames are synchronized with the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// No synchronization. May cause tearing but has lowest latency.
    Immediate,
    /// Triple buffering. Low latency without tearing.
    Mailbox,
    /// VSync enabled. Guaranteed present in all conformant implementations.
    #[default]
    Fifo,
    /// VSync with relaxed timing. May tear if a frame is late.
    FifoRelaxed,
}

/// A two-dimensional extent in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent2d {
    /// Create a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamp each component into the given inclusive bounds.
    pub fn clamp(self, min: Extent2d, max: Extent2d) -> Extent2d {
        Extent2d {
            width: self.width.clamp(min.width, max.width),
            height: self.height.clamp(min.height, max.height),
        }
    }
}

/// Surface capabilities reported for one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCaps {
    /// Minimum number of swapchain images.
    pub min_image_count: u32,
    /// Maximum number of swapchain images; 0 means unbounded.
    pub max_image_count: u32,
    /// Current surface extent, or `None` when the surface reports the
    /// undefined-extent sentinel and the window size decides.
    pub current_extent: Option<Extent2d>,
    /// Smallest supported extent.
    pub min_extent: Extent2d,
    /// Largest supported extent.
    pub max_extent: Extent2d,
    /// Supported (format, color space) pairs, in driver order.
    pub formats: Vec<SurfaceFormat>,
    /// Supported present modes, in driver order.
    pub present_modes: Vec<PresentMode>,
}

/// Type of graphics adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterType {
    /// Discrete GPU (dedicated graphics card).
    Discrete,
    /// Integrated GPU (shared with CPU).
    Integrated,
    /// Software renderer.
    Software,
    /// Unknown adapter type.
    Unknown,
}

/// Capability snapshot of one physical adapter against the target surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterCaps {
    /// Adapter name as reported by the driver.
    pub name: String,
    /// Device type (discrete, integrated, etc.).
    pub adapter_type: AdapterType,
    /// Queue families in driver index order.
    pub queue_families: Vec<QueueFamilyCaps>,
    /// Supported device extension names.
    pub extensions: Vec<String>,
    /// Surface capabilities for this adapter.
    pub surface: SurfaceCaps,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_clamp() {
        let min = Extent2d::new(200, 200);
        let max = Extent2d::new(2000, 2000);
        assert_eq!(
            Extent2d::new(100, 100).clamp(min, max),
            Extent2d::new(200, 200)
        );
        assert_eq!(
            Extent2d::new(3000, 1000).clamp(min, max),
            Extent2d::new(2000, 1000)
        );
        assert_eq!(
            Extent2d::new(800, 600).clamp(min, max),
            Extent2d::new(800, 600)
        );
    }

    #[test]
    fn test_present_mode_default() {
        assert_eq!(PresentMode::default(), PresentMode::Fifo);
    }

    #[test]
    fn test_queue_capabilities_flags() {
        let all = QueueCapabilities::GRAPHICS | QueueCapabilities::COMPUTE
            | QueueCapabilities::TRANSFER;
        assert!(all.contains(QueueCapabilities::GRAPHICS));
        assert!(!QueueCapabilities::TRANSFER.contains(QueueCapabilities::GRAPHICS));
    }
}
