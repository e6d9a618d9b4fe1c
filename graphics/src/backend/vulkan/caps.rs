//! Capability snapshot queries against physical devices and surfaces.

use std::ffi::CStr;

use ash::vk;

use crate::caps::{
    AdapterCaps, AdapterType, Extent2d, QueueCapabilities, QueueFamilyCaps, SurfaceCaps,
};
use crate::error::GraphicsError;

use super::conversion::{present_mode_from_vk, surface_format_from_vk};

/// Build the capability snapshot of every physical device against a surface.
///
/// Devices are visited in the driver's enumeration order, which the
/// negotiator depends on for deterministic selection.
pub fn query_adapter_caps(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_devices: &[vk::PhysicalDevice],
) -> Result<Vec<AdapterCaps>, GraphicsError> {
    let mut adapters = Vec::with_capacity(physical_devices.len());

    for &physical_device in physical_devices {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let adapter_type = if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            AdapterType::Discrete
        } else if properties.device_type == vk::PhysicalDeviceType::INTEGRATED_GPU {
            AdapterType::Integrated
        } else if properties.device_type == vk::PhysicalDeviceType::CPU {
            AdapterType::Software
        } else {
            AdapterType::Unknown
        };

        let queue_families =
            query_queue_families(instance, surface_loader, surface, physical_device);
        let extensions = query_device_extensions(instance, physical_device)?;
        let surface_caps = query_surface_caps(surface_loader, physical_device, surface)?;

        log::debug!(
            "Found adapter {} ({:?}): {} queue families, {} extensions",
            name,
            adapter_type,
            queue_families.len(),
            extensions.len()
        );

        adapters.push(AdapterCaps {
            name,
            adapter_type,
            queue_families,
            extensions,
            surface: surface_caps,
        });
    }

    Ok(adapters)
}

/// Query queue family capabilities including presentation support.
fn query_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Vec<QueueFamilyCaps> {
    let families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    families
        .iter()
        .enumerate()
        .map(|(index, family)| {
            let mut capabilities = QueueCapabilities::empty();
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                capabilities |= QueueCapabilities::GRAPHICS;
            }
            if family.queue_flags.contains(vk::QueueFlags::COMPUTE) {
                capabilities |= QueueCapabilities::COMPUTE;
            }
            if family.queue_flags.contains(vk::QueueFlags::TRANSFER) {
                capabilities |= QueueCapabilities::TRANSFER;
            }

            let present_support = unsafe {
                surface_loader.get_physical_device_surface_support(
                    physical_device,
                    index as u32,
                    surface,
                )
            }
            .unwrap_or(false);

            QueueFamilyCaps {
                capabilities,
                present_support,
            }
        })
        .collect()
}

/// Query the supported device extension names.
fn query_device_extensions(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<Vec<String>, GraphicsError> {
    let properties = unsafe { instance.enumerate_device_extension_properties(physical_device) }
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!(
                "Failed to enumerate device extensions: {:?}",
                e
            ))
        })?;

    Ok(properties
        .iter()
        .map(|ext| {
            unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                .to_string_lossy()
                .into_owned()
        })
        .collect())
}

/// Query the surface capabilities of one physical device.
pub fn query_surface_caps(
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SurfaceCaps, GraphicsError> {
    let capabilities = unsafe {
        surface_loader.get_physical_device_surface_capabilities(physical_device, surface)
    }
    .map_err(|e| {
        GraphicsError::InitializationFailed(format!(
            "Failed to get surface capabilities: {:?}",
            e
        ))
    })?;

    let formats =
        unsafe { surface_loader.get_physical_device_surface_formats(physical_device, surface) }
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!(
                    "Failed to get surface formats: {:?}",
                    e
                ))
            })?;

    let present_modes = unsafe {
        surface_loader.get_physical_device_surface_present_modes(physical_device, surface)
    }
    .map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to get present modes: {:?}", e))
    })?;

    // u32::MAX is the undefined-extent sentinel; the window size decides.
    let current_extent = if capabilities.current_extent.width == u32::MAX {
        None
    } else {
        Some(Extent2d::new(
            capabilities.current_extent.width,
            capabilities.current_extent.height,
        ))
    };

    Ok(SurfaceCaps {
        min_image_count: capabilities.min_image_count,
        max_image_count: capabilities.max_image_count,
        current_extent,
        min_extent: Extent2d::new(
            capabilities.min_image_extent.width,
            capabilities.min_image_extent.height,
        ),
        max_extent: Extent2d::new(
            capabilities.max_image_extent.width,
            capabilities.max_image_extent.height,
        ),
        formats: formats.iter().copied().filter_map(surface_format_from_vk).collect(),
        present_modes: present_modes
            .iter()
            .copied()
            .filter_map(present_mode_from_vk)
            .collect(),
    })
}
