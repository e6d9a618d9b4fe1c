//! Vulkan swapchain realization.
//!
//! Turns a negotiated [`SwapchainConfig`] into a `VkSwapchainKHR` with one
//! image view per swapchain image. The negotiated format, present mode,
//! extent and image count are used verbatim; only the surface transform is
//! re-queried at creation time.

use ash::vk;

use crate::error::GraphicsError;
use crate::negotiate::SwapchainConfig;

use super::conversion::{color_space_to_vk, present_mode_to_vk, texture_format_to_vk};

/// Vulkan swapchain resources.
pub struct VulkanSwapchain {
    pub(crate) swapchain: vk::SwapchainKHR,
    pub(crate) image_views: Vec<vk::ImageView>,
    pub(crate) images: Vec<vk::Image>,
    pub(crate) format: vk::Format,
    pub(crate) extent: vk::Extent2D,
}

impl VulkanSwapchain {
    /// Create a swapchain from a negotiated configuration.
    pub fn new(
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
        surface_loader: &ash::khr::surface::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        config: &SwapchainConfig,
    ) -> Result<Self, GraphicsError> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)
        }
        .map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!(
                "Failed to get surface capabilities: {:?}",
                e
            ))
        })?;

        let format = texture_format_to_vk(config.format.format);
        let extent = vk::Extent2D {
            width: config.extent.width,
            height: config.extent.height,
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(config.image_count)
            .image_format(format)
            .image_color_space(color_space_to_vk(config.format.color_space))
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(config.present_mode))
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| {
                GraphicsError::ResourceCreationFailed(format!(
                    "Failed to create swapchain: {:?}",
                    e
                ))
            })?;

        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!(
                "Failed to get swapchain images: {:?}",
                e
            ))
        })?;

        let image_views: Vec<vk::ImageView> = images
            .iter()
            .map(|&image| create_image_view(device, image, format))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Created Vulkan swapchain: {}x{} with {} images",
            extent.width,
            extent.height,
            images.len()
        );

        Ok(Self {
            swapchain,
            image_views,
            images,
            format,
            extent,
        })
    }

    /// Destroy the swapchain and its image views.
    ///
    /// Idempotent: a second call is a no-op.
    pub fn destroy(
        &mut self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) {
        if self.swapchain == vk::SwapchainKHR::null() {
            return;
        }

        unsafe {
            let _ = device.device_wait_idle();

            for view in self.image_views.drain(..) {
                device.destroy_image_view(view, None);
            }
            self.images.clear();

            swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.swapchain = vk::SwapchainKHR::null();
        }
    }
}

/// Create an image view for a swapchain image.
fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView, GraphicsError> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&view_info, None) }.map_err(|e| {
        GraphicsError::ResourceCreationFailed(format!(
            "Failed to create swapchain image view: {:?}",
            e
        ))
    })
}
