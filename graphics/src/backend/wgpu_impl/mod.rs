//! wgpu GPU backend.
//!
//! Cross-platform backend using wgpu. This is also the viewer's OpenGL
//! path: with [`BackendType::Gl`] the instance is restricted to wgpu's GL
//! backend instead of the platform default.
//!
//! wgpu hides queue families and device extensions, so the capability
//! snapshot synthesizes a single graphics+present queue family and the
//! required extension set for the negotiator; formats and present modes come
//! from the real surface capability query.
//!
//! [`BackendType::Gl`]: crate::instance::BackendType::Gl

pub(crate) mod conversion;

use std::sync::Mutex;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::caps::{
    AdapterCaps, AdapterType, Extent2d, QueueCapabilities, QueueFamilyCaps, SurfaceCaps,
};
use crate::error::GraphicsError;
use crate::instance::{BackendType, InstanceParameters};
use crate::negotiate::{SwapchainConfig, REQUIRED_DEVICE_EXTENSIONS};
use crate::types::{BufferDescriptor, BufferUsage};

use self::conversion::{
    present_mode_from_wgpu, present_mode_to_wgpu, surface_format_from_wgpu,
    texture_format_to_wgpu,
};
use super::{DrawSubmission, GpuBackend, GpuBuffer, UNLIT_WGSL};

/// Vertex attribute layout matching [`Vertex`](stlview_core::mesh::Vertex).
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: Mutex<Option<(wgpu::RenderPipeline, wgpu::TextureFormat)>>,
    configured: Mutex<bool>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a wgpu backend presenting to the given window.
    pub fn with_params<W>(
        params: &InstanceParameters,
        window: &W,
    ) -> Result<Self, GraphicsError>
    where
        W: HasWindowHandle + HasDisplayHandle + Sync,
    {
        let backends = match params.backend {
            BackendType::Gl => wgpu::Backends::GL,
            _ => wgpu::Backends::all(),
        };

        let mut flags = wgpu::InstanceFlags::default();
        if params.validation.requested() {
            flags |= wgpu::InstanceFlags::VALIDATION;
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            flags,
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        // SAFETY: the surface is dropped with the backend, before the window
        // it was created from. The transmute only erases the borrow so the
        // surface can live in the backend struct.
        let surface: wgpu::Surface<'static> = unsafe {
            std::mem::transmute(instance.create_surface(window).map_err(|e| {
                GraphicsError::InitializationFailed(format!(
                    "Failed to create wgpu surface: {e}"
                ))
            })?)
        };

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("No compatible GPU adapter: {e}"))
        })?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("stlview Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("Device creation failed: {e}"))
        })?;

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            pipeline: Mutex::new(None),
            configured: Mutex::new(false),
        })
    }

    fn build_pipeline(&self, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("unlit"),
                source: wgpu::ShaderSource::Wgsl(UNLIT_WGSL.into()),
            });

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("unlit"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("unlit"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: 24,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn adapter_caps(&self) -> Result<Vec<AdapterCaps>, GraphicsError> {
        let info = self.adapter.get_info();
        let adapter_type = match info.device_type {
            wgpu::DeviceType::DiscreteGpu => AdapterType::Discrete,
            wgpu::DeviceType::IntegratedGpu => AdapterType::Integrated,
            wgpu::DeviceType::Cpu => AdapterType::Software,
            _ => AdapterType::Unknown,
        };

        Ok(vec![AdapterCaps {
            name: info.name,
            adapter_type,
            // wgpu exposes one combined queue per device.
            queue_families: vec![QueueFamilyCaps {
                capabilities: QueueCapabilities::GRAPHICS
                    | QueueCapabilities::COMPUTE
                    | QueueCapabilities::TRANSFER,
                present_support: true,
            }],
            // Swapchain support is implied by the surface-compatible
            // adapter request.
            extensions: REQUIRED_DEVICE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            surface: self.surface_caps(0)?,
        }])
    }

    fn surface_caps(&self, adapter_index: usize) -> Result<SurfaceCaps, GraphicsError> {
        if adapter_index != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "adapter index {adapter_index} out of range"
            )));
        }

        let caps = self.surface.get_capabilities(&self.adapter);
        let max_dimension = self.device.limits().max_texture_dimension_2d;

        Ok(SurfaceCaps {
            min_image_count: 2,
            max_image_count: 0,
            // wgpu surfaces size from the configuration, not a reported
            // current extent.
            current_extent: None,
            min_extent: Extent2d::new(1, 1),
            max_extent: Extent2d::new(max_dimension, max_dimension),
            formats: caps
                .formats
                .iter()
                .copied()
                .filter_map(surface_format_from_wgpu)
                .collect(),
            present_modes: caps
                .present_modes
                .iter()
                .copied()
                .filter_map(present_mode_from_wgpu)
                .collect(),
        })
    }

    fn realize_swapchain(&self, config: &SwapchainConfig) -> Result<(), GraphicsError> {
        let format = texture_format_to_wgpu(config.format.format);

        self.surface.configure(
            &self.device,
            &wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width: config.extent.width,
                height: config.extent.height,
                present_mode: present_mode_to_wgpu(config.present_mode),
                alpha_mode: wgpu::CompositeAlphaMode::Auto,
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            },
        );

        if let Ok(mut pipeline) = self.pipeline.lock() {
            let rebuild = pipeline.as_ref().map(|(_, f)| *f) != Some(format);
            if rebuild {
                *pipeline = Some((self.build_pipeline(format), format));
            }
        }
        if let Ok(mut configured) = self.configured.lock() {
            *configured = true;
        }

        log::info!(
            "Configured wgpu surface: {}x{} {:?}",
            config.extent.width,
            config.extent.height,
            format
        );
        Ok(())
    }

    fn release_swapchain(&self) {
        // wgpu surfaces have no explicit unconfigure; dropping the backend
        // releases the swapchain.
        if let Ok(mut configured) = self.configured.lock() {
            *configured = false;
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }

        let mut usage = wgpu::BufferUsages::empty();
        if descriptor.usage.contains(BufferUsage::VERTEX) {
            usage |= wgpu::BufferUsages::VERTEX;
        }
        if descriptor.usage.contains(BufferUsage::INDEX) {
            usage |= wgpu::BufferUsages::INDEX;
        }
        if descriptor.usage.contains(BufferUsage::COPY_DST) {
            usage |= wgpu::BufferUsages::COPY_DST;
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size,
            usage,
            mapped_at_creation: false,
        });

        log::trace!(
            "WgpuBackend: created buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );

        Ok(GpuBuffer::Wgpu(buffer))
    }

    fn write_buffer(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        match buffer {
            GpuBuffer::Wgpu(buffer) => {
                self.queue.write_buffer(buffer, offset, data);
                Ok(())
            }
            #[cfg(feature = "dummy")]
            GpuBuffer::Dummy { .. } => Err(GraphicsError::InvalidParameter(
                "buffer was not created by the wgpu backend".to_string(),
            )),
            #[cfg(feature = "vulkan-backend")]
            GpuBuffer::Vulkan { .. } => Err(GraphicsError::InvalidParameter(
                "buffer was not created by the wgpu backend".to_string(),
            )),
        }
    }

    fn render_frame(
        &self,
        draw: Option<DrawSubmission<'_>>,
        clear_color: [f32; 4],
    ) -> Result<(), GraphicsError> {
        let configured = self.configured.lock().map(|c| *c).unwrap_or(false);
        if !configured {
            return Err(GraphicsError::InvalidParameter(
                "swapchain not configured".to_string(),
            ));
        }

        let surface_texture = self.surface.get_current_texture().map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!(
                "Failed to acquire surface texture: {e}"
            ))
        })?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear+draw"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear_color[0] as f64,
                            g: clear_color[1] as f64,
                            b: clear_color[2] as f64,
                            a: clear_color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(draw) = &draw {
                let (vertex_buffer, index_buffer) =
                    match (draw.vertex_buffer, draw.index_buffer) {
                        (GpuBuffer::Wgpu(vb), GpuBuffer::Wgpu(ib)) => (vb, ib),
                        _ => {
                            return Err(GraphicsError::InvalidParameter(
                                "buffers were not created by the wgpu backend".to_string(),
                            ));
                        }
                    };

                if let Ok(pipeline) = self.pipeline.lock() {
                    if let Some((pipeline, _)) = pipeline.as_ref() {
                        pass.set_pipeline(pipeline);
                        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                        pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..draw.index_count, 0, 0..1);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}
