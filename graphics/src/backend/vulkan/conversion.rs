//! Conversions between snapshot types and Vulkan types.

use ash::vk;

use crate::caps::{ColorSpace, PresentMode, SurfaceFormat, TextureFormat};
use crate::types::BufferUsage;

/// Convert a texture format to its Vulkan equivalent.
pub fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::Bgra8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::Rgba8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
    }
}

/// Convert a Vulkan format into the snapshot model.
///
/// Returns `None` for formats the viewer does not negotiate.
pub fn texture_format_from_vk(format: vk::Format) -> Option<TextureFormat> {
    if format == vk::Format::B8G8R8A8_UNORM {
        Some(TextureFormat::Bgra8Unorm)
    } else if format == vk::Format::B8G8R8A8_SRGB {
        Some(TextureFormat::Bgra8UnormSrgb)
    } else if format == vk::Format::R8G8B8A8_UNORM {
        Some(TextureFormat::Rgba8Unorm)
    } else if format == vk::Format::R8G8B8A8_SRGB {
        Some(TextureFormat::Rgba8UnormSrgb)
    } else if format == vk::Format::R16G16B16A16_SFLOAT {
        Some(TextureFormat::Rgba16Float)
    } else {
        None
    }
}

/// Convert a color space to its Vulkan equivalent.
pub fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonLinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::Linear => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
    }
}

/// Convert a Vulkan color space into the snapshot model.
pub fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> Option<ColorSpace> {
    if color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR {
        Some(ColorSpace::SrgbNonLinear)
    } else if color_space == vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT {
        Some(ColorSpace::Linear)
    } else {
        None
    }
}

/// Convert a reported Vulkan surface format into the snapshot model.
///
/// Returns `None` for pairs the viewer does not negotiate, which keeps the
/// snapshot list ordered like the driver list minus unknown entries.
pub fn surface_format_from_vk(format: vk::SurfaceFormatKHR) -> Option<SurfaceFormat> {
    Some(SurfaceFormat {
        format: texture_format_from_vk(format.format)?,
        color_space: color_space_from_vk(format.color_space)?,
    })
}

/// Convert a present mode to its Vulkan equivalent.
pub fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

/// Convert a Vulkan present mode into the snapshot model.
pub fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    if mode == vk::PresentModeKHR::IMMEDIATE {
        Some(PresentMode::Immediate)
    } else if mode == vk::PresentModeKHR::MAILBOX {
        Some(PresentMode::Mailbox)
    } else if mode == vk::PresentModeKHR::FIFO {
        Some(PresentMode::Fifo)
    } else if mode == vk::PresentModeKHR::FIFO_RELAXED {
        Some(PresentMode::FifoRelaxed)
    } else {
        None
    }
}

/// Convert buffer usage flags to their Vulkan equivalent.
pub fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trip() {
        for format in [
            TextureFormat::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Rgba16Float,
        ] {
            assert_eq!(texture_format_from_vk(texture_format_to_vk(format)), Some(format));
        }
    }

    #[test]
    fn test_unknown_format_filtered() {
        assert_eq!(texture_format_from_vk(vk::Format::R5G6B5_UNORM_PACK16), None);
    }

    #[test]
    fn test_present_mode_round_trip() {
        for mode in [
            PresentMode::Immediate,
            PresentMode::Mailbox,
            PresentMode::Fifo,
            PresentMode::FifoRelaxed,
        ] {
            assert_eq!(present_mode_from_vk(present_mode_to_vk(mode)), Some(mode));
        }
    }
}
