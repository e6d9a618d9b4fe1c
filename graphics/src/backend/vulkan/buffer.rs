//! Vulkan buffer creation and mapped upload.

use ash::vk;
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::types::BufferDescriptor;

use super::super::GpuBuffer;
use super::conversion::buffer_usage_to_vk;

/// Create a host-visible buffer backed by a gpu-allocator allocation.
///
/// CpuToGpu memory keeps the buffer persistently mapped, which fits the
/// viewer's one-shot static uploads.
pub fn create_buffer(
    device: &ash::Device,
    allocator: &mut Allocator,
    descriptor: &BufferDescriptor,
) -> Result<GpuBuffer, GraphicsError> {
    if descriptor.size == 0 {
        return Err(GraphicsError::InvalidParameter(
            "buffer size cannot be zero".to_string(),
        ));
    }

    let buffer_info = vk::BufferCreateInfo::default()
        .size(descriptor.size)
        .usage(buffer_usage_to_vk(descriptor.usage))
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = unsafe { device.create_buffer(&buffer_info, None) }.map_err(|e| {
        GraphicsError::ResourceCreationFailed(format!("Failed to create buffer: {:?}", e))
    })?;

    let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

    let allocation = allocator
        .allocate(&AllocationCreateDesc {
            name: descriptor.label.as_deref().unwrap_or("buffer"),
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| {
            unsafe { device.destroy_buffer(buffer, None) };
            GraphicsError::ResourceCreationFailed(format!("Failed to allocate memory: {e}"))
        })?;

    if let Err(e) =
        unsafe { device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) }
    {
        unsafe { device.destroy_buffer(buffer, None) };
        return Err(GraphicsError::ResourceCreationFailed(format!(
            "Failed to bind buffer memory: {:?}",
            e
        )));
    }

    log::trace!(
        "VulkanBackend: created buffer {:?} (size: {})",
        descriptor.label,
        descriptor.size
    );

    Ok(GpuBuffer::Vulkan {
        device: device.clone(),
        buffer,
        allocation: Mutex::new(Some(allocation)),
        size: descriptor.size,
    })
}

/// Write data into a mapped Vulkan buffer.
pub fn write_buffer(
    allocation: &Mutex<Option<gpu_allocator::vulkan::Allocation>>,
    buffer_size: u64,
    offset: u64,
    data: &[u8],
) -> Result<(), GraphicsError> {
    if offset + data.len() as u64 > buffer_size {
        return Err(GraphicsError::InvalidParameter(format!(
            "write of {} bytes at offset {} exceeds buffer size {}",
            data.len(),
            offset,
            buffer_size
        )));
    }

    let mut guard = allocation.lock();
    let allocation = guard
        .as_mut()
        .ok_or_else(|| GraphicsError::Internal("buffer allocation already taken".to_string()))?;

    let mapped = allocation
        .mapped_slice_mut()
        .ok_or_else(|| GraphicsError::Internal("buffer memory is not mapped".to_string()))?;

    let start = offset as usize;
    mapped[start..start + data.len()].copy_from_slice(data);
    Ok(())
}
