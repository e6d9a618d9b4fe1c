//! Vulkan instance creation and configuration.

use std::ffi::CStr;

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::error::GraphicsError;
use crate::instance::{InstanceParameters, ValidationMode};

use super::debug;

/// Required Vulkan API version. Dynamic rendering is core in 1.3.
const REQUIRED_API_VERSION: u32 = vk::make_api_version(0, 1, 3, 0);

/// Validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Debug messenger handles kept alive with the instance.
pub struct DebugHandles {
    /// Debug utils extension instance.
    pub utils: ash::ext::debug_utils::Instance,
    /// The registered messenger.
    pub messenger: vk::DebugUtilsMessengerEXT,
}

/// Create a Vulkan instance honoring the validation request.
///
/// # Errors
///
/// Fails with [`GraphicsError::ValidationUnavailable`] when
/// [`ValidationMode::Required`] is set but the validation layer is not
/// installed; [`ValidationMode::Preferred`] degrades with a warning instead.
pub fn create_instance(
    entry: &ash::Entry,
    params: &InstanceParameters,
    display_handle: RawDisplayHandle,
) -> Result<(ash::Instance, Option<DebugHandles>), GraphicsError> {
    let layer_available = check_validation_layer_support(entry);
    let validation_enabled = match params.validation {
        ValidationMode::Disabled => false,
        ValidationMode::Preferred => {
            if !layer_available {
                log::warn!("Validation layers requested but not available");
            }
            layer_available
        }
        ValidationMode::Required => {
            if !layer_available {
                return Err(GraphicsError::ValidationUnavailable);
            }
            true
        }
    };

    let app_name = c"stlview";
    let app_info = vk::ApplicationInfo::default()
        .application_name(app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(app_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(REQUIRED_API_VERSION);

    // Surface extensions for the host windowing system.
    let mut extensions = ash_window::enumerate_required_extensions(display_handle)
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!(
                "Failed to enumerate surface extensions: {:?}",
                e
            ))
        })?
        .to_vec();

    if validation_enabled {
        extensions.push(ash::ext::debug_utils::NAME.as_ptr());
    }

    #[allow(unused_mut)]
    let mut create_flags = vk::InstanceCreateFlags::empty();

    #[cfg(target_os = "macos")]
    {
        extensions.push(ash::khr::portability_enumeration::NAME.as_ptr());
        create_flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    }

    let layer_names: Vec<*const std::ffi::c_char> = if validation_enabled {
        vec![VALIDATION_LAYER_NAME.as_ptr()]
    } else {
        vec![]
    };

    let create_info = vk::InstanceCreateInfo::default()
        .flags(create_flags)
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layer_names);

    let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create Vulkan instance: {:?}", e))
    })?;

    let debug = if validation_enabled {
        let utils = ash::ext::debug_utils::Instance::new(entry, &instance);
        let messenger = debug::create_debug_messenger(&utils)?;
        log::info!("Vulkan validation layers enabled");
        Some(DebugHandles { utils, messenger })
    } else {
        None
    };

    Ok((instance, debug))
}

/// Check if the validation layer is available.
fn check_validation_layer_support(entry: &ash::Entry) -> bool {
    let available_layers = match unsafe { entry.enumerate_instance_layer_properties() } {
        Ok(layers) => layers,
        Err(_) => return false,
    };

    available_layers.iter().any(|layer| {
        let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
        name == VALIDATION_LAYER_NAME
    })
}
