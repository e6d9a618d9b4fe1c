//! Conversions between snapshot types and wgpu types.

use crate::caps::{ColorSpace, PresentMode, SurfaceFormat, TextureFormat};

/// Convert a texture format to its wgpu equivalent.
pub fn texture_format_to_wgpu(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

/// Convert a reported wgpu surface format into the snapshot model.
///
/// wgpu folds the color space into the format: sRGB-suffixed formats
/// present through the sRGB transfer function, the rest are linear.
pub fn surface_format_from_wgpu(format: wgpu::TextureFormat) -> Option<SurfaceFormat> {
    let (format, color_space) = match format {
        wgpu::TextureFormat::Bgra8Unorm => (TextureFormat::Bgra8Unorm, ColorSpace::Linear),
        wgpu::TextureFormat::Bgra8UnormSrgb => {
            (TextureFormat::Bgra8UnormSrgb, ColorSpace::SrgbNonLinear)
        }
        wgpu::TextureFormat::Rgba8Unorm => (TextureFormat::Rgba8Unorm, ColorSpace::Linear),
        wgpu::TextureFormat::Rgba8UnormSrgb => {
            (TextureFormat::Rgba8UnormSrgb, ColorSpace::SrgbNonLinear)
        }
        wgpu::TextureFormat::Rgba16Float => (TextureFormat::Rgba16Float, ColorSpace::Linear),
        _ => return None,
    };
    Some(SurfaceFormat {
        format,
        color_space,
    })
}

/// Convert a present mode to its wgpu equivalent.
pub fn present_mode_to_wgpu(mode: PresentMode) -> wgpu::PresentMode {
    match mode {
        PresentMode::Immediate => wgpu::PresentMode::Immediate,
        PresentMode::Mailbox => wgpu::PresentMode::Mailbox,
        PresentMode::Fifo => wgpu::PresentMode::Fifo,
        PresentMode::FifoRelaxed => wgpu::PresentMode::FifoRelaxed,
    }
}

/// Convert a wgpu present mode into the snapshot model.
pub fn present_mode_from_wgpu(mode: wgpu::PresentMode) -> Option<PresentMode> {
    match mode {
        wgpu::PresentMode::Immediate => Some(PresentMode::Immediate),
        wgpu::PresentMode::Mailbox => Some(PresentMode::Mailbox),
        wgpu::PresentMode::Fifo => Some(PresentMode::Fifo),
        wgpu::PresentMode::FifoRelaxed => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}
