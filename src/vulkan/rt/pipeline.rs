use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use crate::error::{Error, Result, VkCheck};
use crate::vulkan::debug;
use crate::vulkan::debug::DebugResource;
use crate::vulkan::device::Device;
use crate::vulkan::shader::ShaderModule;

/// Shader group over indices into the pipeline's stage list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderGroup {
    /// Raygen or miss.
    General(u32),
    TrianglesHit { closest_hit: u32, any_hit: Option<u32> },
}

impl ShaderGroup {
    pub fn create_info(&self) -> vk::RayTracingShaderGroupCreateInfoNV {
        let builder = vk::RayTracingShaderGroupCreateInfoNV::builder()
            .intersection_shader(vk::SHADER_UNUSED_NV);

        match *self {
            ShaderGroup::General(stage) => builder
                .ty(vk::RayTracingShaderGroupTypeNV::GENERAL)
                .general_shader(stage)
                .closest_hit_shader(vk::SHADER_UNUSED_NV)
                .any_hit_shader(vk::SHADER_UNUSED_NV)
                .build(),
            ShaderGroup::TrianglesHit { closest_hit, any_hit } => builder
                .ty(vk::RayTracingShaderGroupTypeNV::TRIANGLES_HIT_GROUP)
                .general_shader(vk::SHADER_UNUSED_NV)
                .closest_hit_shader(closest_hit)
                .any_hit_shader(any_hit.unwrap_or(vk::SHADER_UNUSED_NV))
                .build(),
        }
    }
}

/// Raytracing pipeline with its layout and the single descriptor set layout it uses.
pub struct RtPipeline {
    device: Rc<Device>,
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub group_count: u32,
    label: String,
}

impl RtPipeline {
    /// `binding_flags` is either empty or one entry per binding.
    pub fn new(
        device: &Rc<Device>,
        stages: &[ShaderModule],
        groups: &[ShaderGroup],
        bindings: &[vk::DescriptorSetLayoutBinding],
        binding_flags: &[vk::DescriptorBindingFlags],
        max_recursion_depth: u32,
        label: &str,
    ) -> Result<RtPipeline> {
        let mut ret = RtPipeline {
            device: Rc::clone(device),
            pipeline: vk::Pipeline::null(),
            layout: vk::PipelineLayout::null(),
            descriptor_set_layout: vk::DescriptorSetLayout::null(),
            group_count: groups.len() as u32,
            label: String::from(label),
        };

        let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::builder().binding_flags(binding_flags);
        let mut layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(bindings);
        if !binding_flags.is_empty() {
            layout_info = layout_info.push_next(&mut flags_info);
        }
        ret.descriptor_set_layout = unsafe { device.logical_device.create_descriptor_set_layout(&layout_info, None) }
            .check("vkCreateDescriptorSetLayout")?;

        let set_layouts = [ret.descriptor_set_layout];
        let pipeline_layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        ret.layout = unsafe { device.logical_device.create_pipeline_layout(&pipeline_layout_info, None) }
            .check("vkCreatePipelineLayout")?;

        let stage_infos: Vec<vk::PipelineShaderStageCreateInfo> =
            stages.iter().map(|stage| stage.stage_create_info()).collect();
        let group_infos: Vec<vk::RayTracingShaderGroupCreateInfoNV> =
            groups.iter().map(|group| group.create_info()).collect();

        let pipeline_info = [vk::RayTracingPipelineCreateInfoNV::builder()
            .stages(&stage_infos)
            .groups(&group_infos)
            .max_recursion_depth(max_recursion_depth)
            .layout(ret.layout)
            .build()];

        let pipelines = unsafe {
            device
                .raytracing
                .loader
                .create_ray_tracing_pipelines(vk::PipelineCache::null(), &pipeline_info, None)
        }
        .check("vkCreateRayTracingPipelinesNV")?;
        ret.pipeline = pipelines.into_iter().next().ok_or(Error::Vulkan {
            call: "vkCreateRayTracingPipelinesNV",
            result: vk::Result::ERROR_INITIALIZATION_FAILED,
        })?;

        debug::Object::label(device, &ret);

        Ok(ret)
    }

    pub fn cmd_bind(&self, cmd_buffer: vk::CommandBuffer, descriptor_set: vk::DescriptorSet) {
        unsafe {
            self.device.logical_device.cmd_bind_pipeline(
                cmd_buffer,
                vk::PipelineBindPoint::RAY_TRACING_NV,
                self.pipeline,
            );
            self.device.logical_device.cmd_bind_descriptor_sets(
                cmd_buffer,
                vk::PipelineBindPoint::RAY_TRACING_NV,
                self.layout,
                0,
                &[descriptor_set],
                &[],
            );
        }
    }
}

impl DebugResource for RtPipeline {
    fn get_type(&self) -> vk::ObjectType {
        vk::ObjectType::PIPELINE
    }

    fn get_handle(&self) -> u64 {
        self.pipeline.as_raw()
    }

    fn get_label(&self) -> &String {
        &self.label
    }
}

impl Drop for RtPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.logical_device.destroy_pipeline(self.pipeline, None);
            self.device.logical_device.destroy_pipeline_layout(self.layout, None);
            self.device
                .logical_device
                .destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_group() {
        let info = ShaderGroup::General(3).create_info();
        assert_eq!(info.ty, vk::RayTracingShaderGroupTypeNV::GENERAL);
        assert_eq!(info.general_shader, 3);
        assert_eq!(info.closest_hit_shader, vk::SHADER_UNUSED_NV);
        assert_eq!(info.any_hit_shader, vk::SHADER_UNUSED_NV);
        assert_eq!(info.intersection_shader, vk::SHADER_UNUSED_NV);
    }

    #[test]
    fn hit_group_with_any_hit() {
        let info = ShaderGroup::TrianglesHit {
            closest_hit: 1,
            any_hit: Some(2),
        }
        .create_info();
        assert_eq!(info.ty, vk::RayTracingShaderGroupTypeNV::TRIANGLES_HIT_GROUP);
        assert_eq!(info.general_shader, vk::SHADER_UNUSED_NV);
        assert_eq!(info.closest_hit_shader, 1);
        assert_eq!(info.any_hit_shader, 2);
    }

    #[test]
    fn hit_group_without_any_hit() {
        let info = ShaderGroup::TrianglesHit {
            closest_hit: 2,
            any_hit: None,
        }
        .create_info();
        assert_eq!(info.closest_hit_shader, 2);
        assert_eq!(info.any_hit_shader, vk::SHADER_UNUSED_NV);
    }
}
