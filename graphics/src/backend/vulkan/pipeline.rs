//! Unlit graphics pipeline for the Vulkan backend.
//!
//! The WGSL source shared with the wgpu backend is compiled to SPIR-V
//! through naga at pipeline creation time. The pipeline targets dynamic
//! rendering, so it is parameterized only by the swapchain color format.

use std::ffi::CStr;

use ash::vk;

use crate::error::GraphicsError;

use super::super::UNLIT_WGSL;

const VS_ENTRY: &CStr = c"vs_main";
const FS_ENTRY: &CStr = c"fs_main";

/// Stride of one vertex: position `[f32; 3]` + color `[f32; 3]`.
const VERTEX_STRIDE: u32 = 24;

/// Pipeline and layout for drawing the mesh.
pub struct VulkanPipeline {
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    /// Color format the pipeline was built against.
    pub(crate) format: vk::Format,
}

impl VulkanPipeline {
    /// Build the unlit pipeline for the given swapchain color format.
    pub fn new(device: &ash::Device, format: vk::Format) -> Result<Self, GraphicsError> {
        let spirv = compile_wgsl(UNLIT_WGSL)?;

        let module_info = vk::ShaderModuleCreateInfo::default().code(&spirv);
        let module = unsafe { device.create_shader_module(&module_info, None) }.map_err(|e| {
            GraphicsError::ShaderCompilationFailed(format!(
                "Failed to create shader module: {:?}",
                e
            ))
        })?;

        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(module)
                .name(VS_ENTRY),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(module)
                .name(FS_ENTRY),
        ];

        let binding_descriptions = [vk::VertexInputBindingDescription {
            binding: 0,
            stride: VERTEX_STRIDE,
            input_rate: vk::VertexInputRate::VERTEX,
        }];
        let attribute_descriptions = [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12,
            },
        ];
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&binding_descriptions)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        // Viewport and scissor are dynamic so a resized swapchain does not
        // require a new pipeline.
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(&blend_attachments);

        let layout_info = vk::PipelineLayoutCreateInfo::default();
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!(
                "Failed to create pipeline layout: {:?}",
                e
            ))
        })?;

        let color_formats = [format];
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
        };

        unsafe {
            device.destroy_shader_module(module, None);
        }

        let pipeline = match pipelines {
            Ok(pipelines) if !pipelines.is_empty() => pipelines[0],
            Ok(_) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(GraphicsError::Internal(
                    "pipeline creation returned no pipeline".to_string(),
                ));
            }
            Err((_, e)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(GraphicsError::ResourceCreationFailed(format!(
                    "Failed to create graphics pipeline: {:?}",
                    e
                )));
            }
        };

        log::debug!("Created unlit pipeline for format {:?}", format);

        Ok(Self {
            pipeline,
            layout,
            format,
        })
    }

    /// Destroy the pipeline and its layout.
    pub fn destroy(&mut self, device: &ash::Device) {
        if self.pipeline == vk::Pipeline::null() {
            return;
        }
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
        self.pipeline = vk::Pipeline::null();
        self.layout = vk::PipelineLayout::null();
    }
}

/// Compile WGSL source to a SPIR-V word stream.
fn compile_wgsl(source: &str) -> Result<Vec<u32>, GraphicsError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| GraphicsError::ShaderCompilationFailed(format!("WGSL parse error: {e}")))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    let info = validator
        .validate(&module)
        .map_err(|e| GraphicsError::ShaderCompilationFailed(format!("Validation error: {e}")))?;

    let options = naga::back::spv::Options {
        lang_version: (1, 3),
        ..Default::default()
    };

    naga::back::spv::write_vec(&module, &info, &options, None)
        .map_err(|e| GraphicsError::ShaderCompilationFailed(format!("SPIR-V emit error: {e}")))
}
