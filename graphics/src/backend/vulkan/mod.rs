//! Native Vulkan backend using ash.
//!
//! The backend is created in two phases. Instance, surface and physical
//! device enumeration happen at construction so capability snapshots can be
//! queried for negotiation. The logical device, allocator and pipeline are
//! created the first time a negotiated configuration is realized, pinned to
//! the adapter and queue family negotiation selected.
//!
//! Teardown is strictly reverse of construction: swapchain and pipeline
//! before the device, the device before the surface, the surface before the
//! instance.

mod buffer;
mod caps;
pub(crate) mod conversion;
mod debug;
mod instance;
mod pipeline;
mod swapchain;

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::caps::{AdapterCaps, SurfaceCaps};
use crate::error::GraphicsError;
use crate::instance::InstanceParameters;
use crate::negotiate::SwapchainConfig;
use crate::types::BufferDescriptor;

use self::instance::DebugHandles;
use self::pipeline::VulkanPipeline;
use self::swapchain::VulkanSwapchain;
use super::{DrawSubmission, GpuBackend, GpuBuffer};

/// Device-level state created when the first configuration is realized.
struct DeviceState {
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    device: ash::Device,
    queue: vk::Queue,
    swapchain_loader: ash::khr::swapchain::Device,
    /// Taken out before the device is destroyed.
    allocator: Option<Allocator>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
    pipeline: Option<VulkanPipeline>,
    swapchain: Option<VulkanSwapchain>,
}

/// Vulkan-based GPU backend.
pub struct VulkanBackend {
    /// Function loader; must stay alive while any Vulkan handle exists.
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    debug: Option<DebugHandles>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    /// Physical devices in driver enumeration order.
    physical_devices: Vec<vk::PhysicalDevice>,
    state: Mutex<Option<DeviceState>>,
}

impl std::fmt::Debug for VulkanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBackend")
            .field("physical_devices", &self.physical_devices.len())
            .field("validation", &self.debug.is_some())
            .finish()
    }
}

impl VulkanBackend {
    /// Create the Vulkan instance and surface for the given window.
    ///
    /// # Errors
    ///
    /// Fails when the Vulkan loader is absent, instance or surface creation
    /// fails, no physical device is present, or required validation layers
    /// are unavailable.
    pub fn with_params<W>(
        params: &InstanceParameters,
        window: &W,
    ) -> Result<Self, GraphicsError>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to load Vulkan: {e}"))
        })?;

        let display_handle = window.display_handle().map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to get display handle: {e}"))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to get window handle: {e}"))
        })?;

        let (instance, debug) =
            instance::create_instance(&entry, params, display_handle.as_raw())?;

        let surface = unsafe {
            ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to create surface: {:?}", e))
        })?;

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let physical_devices = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!(
                "Failed to enumerate physical devices: {:?}",
                e
            ))
        })?;

        if physical_devices.is_empty() {
            // Tear down what was built; Drop would otherwise double-free on
            // a partially constructed value.
            unsafe {
                surface_loader.destroy_surface(surface, None);
                if let Some(debug) = &debug {
                    debug
                        .utils
                        .destroy_debug_utils_messenger(debug.messenger, None);
                }
                instance.destroy_instance(None);
            }
            return Err(GraphicsError::InitializationFailed(
                "No Vulkan-capable GPU found".to_string(),
            ));
        }

        log::info!(
            "Vulkan backend initialized: {} physical devices",
            physical_devices.len()
        );

        Ok(Self {
            entry,
            instance,
            debug,
            surface_loader,
            surface,
            physical_devices,
            state: Mutex::new(None),
        })
    }

    fn physical_device(&self, adapter_index: usize) -> Result<vk::PhysicalDevice, GraphicsError> {
        self.physical_devices
            .get(adapter_index)
            .copied()
            .ok_or_else(|| {
                GraphicsError::InvalidParameter(format!(
                    "adapter index {adapter_index} out of range ({})",
                    self.physical_devices.len()
                ))
            })
    }

    /// Create the logical device pinned to the negotiated adapter/family.
    fn create_device_state(&self, config: &SwapchainConfig) -> Result<DeviceState, GraphicsError> {
        let physical_device = self.physical_device(config.adapter_index)?;

        let queue_priorities = [1.0f32];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(config.queue_family_index)
            .queue_priorities(&queue_priorities)];

        let device_extensions = [ash::khr::swapchain::NAME.as_ptr()];

        let mut vulkan_13_features =
            vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extensions)
            .push_next(&mut vulkan_13_features);

        let device = unsafe {
            self.instance
                .create_device(physical_device, &create_info, None)
        }
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!(
                "Failed to create logical device: {:?}",
                e
            ))
        })?;

        let queue = unsafe { device.get_device_queue(config.queue_family_index, 0) };
        let swapchain_loader = ash::khr::swapchain::Device::new(&self.instance, &device);

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: self.instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            unsafe { device.destroy_device(None) };
            GraphicsError::InitializationFailed(format!(
                "Failed to create memory allocator: {e}"
            ))
        })?;

        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(config.queue_family_index);
        let command_pool = unsafe { device.create_command_pool(&pool_info, None) }.map_err(
            |e| {
                GraphicsError::InitializationFailed(format!(
                    "Failed to create command pool: {:?}",
                    e
                ))
            },
        )?;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = unsafe { device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!(
                    "Failed to allocate command buffer: {:?}",
                    e
                ))
            })?[0];

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        let image_available = unsafe { device.create_semaphore(&semaphore_info, None) }
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!(
                    "Failed to create semaphore: {:?}",
                    e
                ))
            })?;
        let render_finished = unsafe { device.create_semaphore(&semaphore_info, None) }
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!(
                    "Failed to create semaphore: {:?}",
                    e
                ))
            })?;
        let in_flight = unsafe { device.create_fence(&fence_info, None) }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to create fence: {:?}", e))
        })?;

        log::info!(
            "Created logical device on adapter {} (queue family {})",
            config.adapter_index,
            config.queue_family_index
        );

        Ok(DeviceState {
            physical_device,
            queue_family: config.queue_family_index,
            device,
            queue,
            swapchain_loader,
            allocator: Some(allocator),
            command_pool,
            command_buffer,
            image_available,
            render_finished,
            in_flight,
            pipeline: None,
            swapchain: None,
        })
    }
}

impl GpuBackend for VulkanBackend {
    fn name(&self) -> &'static str {
        "Vulkan Backend (ash)"
    }

    fn adapter_caps(&self) -> Result<Vec<AdapterCaps>, GraphicsError> {
        caps::query_adapter_caps(
            &self.instance,
            &self.surface_loader,
            self.surface,
            &self.physical_devices,
        )
    }

    fn surface_caps(&self, adapter_index: usize) -> Result<SurfaceCaps, GraphicsError> {
        let physical_device = self.physical_device(adapter_index)?;
        caps::query_surface_caps(&self.surface_loader, physical_device, self.surface)
    }

    fn realize_swapchain(&self, config: &SwapchainConfig) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();

        if state.is_none() {
            *state = Some(self.create_device_state(config)?);
        }

        if let Some(st) = state.as_mut() {
            if st.physical_device != self.physical_device(config.adapter_index)?
                || st.queue_family != config.queue_family_index
            {
                return Err(GraphicsError::InvalidParameter(
                    "device selection cannot change after realization".to_string(),
                ));
            }

            // Destroy the old swapchain before creating the replacement.
            if let Some(mut old) = st.swapchain.take() {
                old.destroy(&st.device, &st.swapchain_loader);
            }

            let new_swapchain = VulkanSwapchain::new(
                &st.device,
                &st.swapchain_loader,
                &self.surface_loader,
                st.physical_device,
                self.surface,
                config,
            )?;

            let format_changed =
                st.pipeline.as_ref().map(|p| p.format) != Some(new_swapchain.format);
            if format_changed {
                if let Some(mut old) = st.pipeline.take() {
                    unsafe {
                        let _ = st.device.device_wait_idle();
                    }
                    old.destroy(&st.device);
                }
                st.pipeline = Some(VulkanPipeline::new(&st.device, new_swapchain.format)?);
            }

            st.swapchain = Some(new_swapchain);
        }

        Ok(())
    }

    fn release_swapchain(&self) {
        let mut state = self.state.lock();
        if let Some(st) = state.as_mut() {
            if let Some(mut old) = st.swapchain.take() {
                old.destroy(&st.device, &st.swapchain_loader);
            }
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        let mut state = self.state.lock();
        let st = state.as_mut().ok_or_else(|| {
            GraphicsError::InvalidParameter("device not initialized".to_string())
        })?;
        let allocator = st
            .allocator
            .as_mut()
            .ok_or_else(|| GraphicsError::Internal("allocator already released".to_string()))?;
        buffer::create_buffer(&st.device, allocator, descriptor)
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        match buffer {
            GpuBuffer::Vulkan {
                allocation, size, ..
            } => buffer::write_buffer(allocation, *size, offset, data),
            #[cfg(feature = "dummy")]
            GpuBuffer::Dummy { .. } => Err(GraphicsError::InvalidParameter(
                "buffer was not created by the Vulkan backend".to_string(),
            )),
            #[cfg(feature = "wgpu-backend")]
            GpuBuffer::Wgpu(_) => Err(GraphicsError::InvalidParameter(
                "buffer was not created by the Vulkan backend".to_string(),
            )),
        }
    }

    fn render_frame(
        &self,
        draw: Option<DrawSubmission<'_>>,
        clear_color: [f32; 4],
    ) -> Result<(), GraphicsError> {
        let mut state = self.state.lock();
        let st = state.as_mut().ok_or_else(|| {
            GraphicsError::InvalidParameter("device not initialized".to_string())
        })?;

        let (swapchain_handle, extent, image, view) = {
            let sc = st.swapchain.as_ref().ok_or_else(|| {
                GraphicsError::InvalidParameter("swapchain not configured".to_string())
            })?;

            // One frame in flight: wait for the previous submission. The
            // fence is reset only right before submit, so a skipped frame
            // leaves it signaled.
            unsafe {
                st.device
                    .wait_for_fences(&[st.in_flight], true, u64::MAX)
            }
            .map_err(|e| GraphicsError::Internal(format!("Fence wait failed: {:?}", e)))?;

            let acquired = unsafe {
                st.swapchain_loader.acquire_next_image(
                    sc.swapchain,
                    u64::MAX,
                    st.image_available,
                    vk::Fence::null(),
                )
            };
            let (image_index, _suboptimal) = match acquired {
                Ok(result) => result,
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    log::warn!("Swapchain out of date, skipping frame");
                    return Ok(());
                }
                Err(e) => {
                    return Err(GraphicsError::Internal(format!(
                        "Failed to acquire swapchain image: {:?}",
                        e
                    )));
                }
            };

            (
                sc.swapchain,
                sc.extent,
                sc.images[image_index as usize],
                (image_index, sc.image_views[image_index as usize]),
            )
        };
        let (image_index, image_view) = view;

        let cmd = st.command_buffer;
        let device = &st.device;

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| {
                    GraphicsError::Internal(format!("Failed to reset command buffer: {:?}", e))
                })?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(cmd, &begin_info).map_err(|e| {
                GraphicsError::Internal(format!("Failed to begin command buffer: {:?}", e))
            })?;

            let subresource = vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            };

            // Undefined -> color attachment for rendering.
            let to_color = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_color],
            );

            let clear_value = vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_color,
                },
            };
            let color_attachments = [vk::RenderingAttachmentInfo::default()
                .image_view(image_view)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .clear_value(clear_value)];
            let rendering_info = vk::RenderingInfo::default()
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .layer_count(1)
                .color_attachments(&color_attachments);

            device.cmd_begin_rendering(cmd, &rendering_info);

            if let Some(draw) = &draw {
                let (vertex_buffer, index_buffer) =
                    match (draw.vertex_buffer, draw.index_buffer) {
                        (
                            GpuBuffer::Vulkan { buffer: vb, .. },
                            GpuBuffer::Vulkan { buffer: ib, .. },
                        ) => (*vb, *ib),
                        _ => {
                            device.cmd_end_rendering(cmd);
                            let _ = device.end_command_buffer(cmd);
                            return Err(GraphicsError::InvalidParameter(
                                "buffers were not created by the Vulkan backend".to_string(),
                            ));
                        }
                    };

                if let Some(pipeline) = &st.pipeline {
                    device.cmd_bind_pipeline(
                        cmd,
                        vk::PipelineBindPoint::GRAPHICS,
                        pipeline.pipeline,
                    );
                    device.cmd_set_viewport(
                        cmd,
                        0,
                        &[vk::Viewport {
                            x: 0.0,
                            y: 0.0,
                            width: extent.width as f32,
                            height: extent.height as f32,
                            min_depth: 0.0,
                            max_depth: 1.0,
                        }],
                    );
                    device.cmd_set_scissor(
                        cmd,
                        0,
                        &[vk::Rect2D {
                            offset: vk::Offset2D { x: 0, y: 0 },
                            extent,
                        }],
                    );
                    device.cmd_bind_vertex_buffers(cmd, 0, &[vertex_buffer], &[0]);
                    device.cmd_bind_index_buffer(cmd, index_buffer, 0, vk::IndexType::UINT32);
                    device.cmd_draw_indexed(cmd, draw.index_count, 1, 0, 0, 0);
                }
            }

            device.cmd_end_rendering(cmd);

            // Color attachment -> presentable.
            let to_present = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource)
                .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                .dst_access_mask(vk::AccessFlags::empty());
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_present],
            );

            device.end_command_buffer(cmd).map_err(|e| {
                GraphicsError::Internal(format!("Failed to end command buffer: {:?}", e))
            })?;

            let wait_semaphores = [st.image_available];
            let signal_semaphores = [st.render_finished];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let command_buffers = [cmd];
            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            device
                .reset_fences(&[st.in_flight])
                .map_err(|e| GraphicsError::Internal(format!("Fence reset failed: {:?}", e)))?;
            device
                .queue_submit(st.queue, &[submit_info], st.in_flight)
                .map_err(|e| GraphicsError::Internal(format!("Queue submit failed: {:?}", e)))?;

            let swapchains = [swapchain_handle];
            let image_indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&signal_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match st.swapchain_loader.queue_present(st.queue, &present_info) {
                Ok(_) => {}
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) | Err(vk::Result::SUBOPTIMAL_KHR) => {
                    log::warn!("Swapchain out of date, needs recreation");
                }
                Err(e) => {
                    return Err(GraphicsError::Internal(format!(
                        "Failed to present swapchain image: {:?}",
                        e
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if let Some(mut st) = self.state.lock().take() {
            unsafe {
                let _ = st.device.device_wait_idle();

                if let Some(mut sc) = st.swapchain.take() {
                    sc.destroy(&st.device, &st.swapchain_loader);
                }
                if let Some(mut pipeline) = st.pipeline.take() {
                    pipeline.destroy(&st.device);
                }

                st.device.destroy_semaphore(st.image_available, None);
                st.device.destroy_semaphore(st.render_finished, None);
                st.device.destroy_fence(st.in_flight, None);
                st.device.destroy_command_pool(st.command_pool, None);

                // The allocator must release its memory blocks while the
                // device is still alive.
                st.allocator.take();

                st.device.destroy_device(None);
            }
        }

        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
            if let Some(debug) = &self.debug {
                debug
                    .utils
                    .destroy_debug_utils_messenger(debug.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
