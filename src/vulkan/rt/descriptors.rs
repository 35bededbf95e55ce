use std::rc::Rc;

use ash::vk;

use crate::error::{Result, VkCheck};
use crate::vulkan::device::Device;
use crate::vulkan::mem::Buffer;
use crate::vulkan::rt::accel::AccelerationStructure;

pub const ACCELERATION_STRUCTURE_BINDING: u32 = 0;
pub const OUTPUT_IMAGE_BINDING: u32 = 1;
pub const UNIFORM_BUFFERS_BINDING: u32 = 2;

pub fn acceleration_structure_binding(stages: vk::ShaderStageFlags) -> vk::DescriptorSetLayoutBinding {
    vk::DescriptorSetLayoutBinding::builder()
        .binding(ACCELERATION_STRUCTURE_BINDING)
        .descriptor_type(vk::DescriptorType::ACCELERATION_STRUCTURE_NV)
        .descriptor_count(1)
        .stage_flags(stages)
        .build()
}

pub fn output_image_binding(stages: vk::ShaderStageFlags) -> vk::DescriptorSetLayoutBinding {
    vk::DescriptorSetLayoutBinding::builder()
        .binding(OUTPUT_IMAGE_BINDING)
        .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
        .descriptor_count(1)
        .stage_flags(stages)
        .build()
}

/// `max_count` is an upper bound when the binding has a variable count.
pub fn uniform_buffers_binding(max_count: u32, stages: vk::ShaderStageFlags) -> vk::DescriptorSetLayoutBinding {
    vk::DescriptorSetLayoutBinding::builder()
        .binding(UNIFORM_BUFFERS_BINDING)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(max_count)
        .stage_flags(stages)
        .build()
}

pub fn pool_sizes(set_count: u32, uniforms_per_set: u32) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes = vec![
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_IMAGE,
            descriptor_count: set_count,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::ACCELERATION_STRUCTURE_NV,
            descriptor_count: set_count,
        },
    ];
    if uniforms_per_set > 0 {
        sizes.push(vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: set_count * uniforms_per_set,
        });
    }

    sizes
}

/// Pool with one set per buffered frame, all sharing one layout.
pub struct DescriptorSets {
    device: Rc<Device>,
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
}

impl DescriptorSets {
    /// `variable_count` is the actual descriptor count of a variable-count last binding.
    pub fn new(
        device: &Rc<Device>,
        layout: vk::DescriptorSetLayout,
        count: u32,
        uniforms_per_set: u32,
        variable_count: Option<u32>,
    ) -> Result<DescriptorSets> {
        let sizes = pool_sizes(count, uniforms_per_set);
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&sizes)
            .max_sets(count);
        let pool = unsafe { device.logical_device.create_descriptor_pool(&pool_info, None) }
            .check("vkCreateDescriptorPool")?;

        let mut ret = DescriptorSets {
            device: Rc::clone(device),
            pool,
            sets: vec![],
        };

        let layouts = vec![layout; count as usize];
        let counts = vec![variable_count.unwrap_or(0); count as usize];
        let mut variable_count_info =
            vk::DescriptorSetVariableDescriptorCountAllocateInfo::builder().descriptor_counts(&counts);
        let mut allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        if variable_count.is_some() {
            allocate_info = allocate_info.push_next(&mut variable_count_info);
        }

        ret.sets = unsafe { device.logical_device.allocate_descriptor_sets(&allocate_info) }
            .check("vkAllocateDescriptorSets")?;

        Ok(ret)
    }

    pub fn get(&self, idx: usize) -> vk::DescriptorSet {
        self.sets[idx]
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Points set `idx` at the TLAS, the output image and, when given, the uniform buffers.
    pub fn write(&self, idx: usize, tlas: &AccelerationStructure, output_view: vk::ImageView, uniforms: &[&Buffer]) {
        let set = self.sets[idx];

        let structures = [tlas.accel];
        let mut accel_info =
            vk::WriteDescriptorSetAccelerationStructureNV::builder().acceleration_structures(&structures);
        let mut accel_write = vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(ACCELERATION_STRUCTURE_BINDING)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::ACCELERATION_STRUCTURE_NV)
            .push_next(&mut accel_info)
            .build();
        // Count is not derived from pNext
        accel_write.descriptor_count = 1;

        let image_info = [vk::DescriptorImageInfo::builder()
            .image_view(output_view)
            .image_layout(vk::ImageLayout::GENERAL)
            .build()];
        let image_write = vk::WriteDescriptorSet::builder()
            .dst_set(set)
            .dst_binding(OUTPUT_IMAGE_BINDING)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
            .image_info(&image_info)
            .build();

        let buffer_infos: Vec<vk::DescriptorBufferInfo> = uniforms
            .iter()
            .map(|buffer| vk::DescriptorBufferInfo {
                buffer: buffer.get_vk_buffer(),
                offset: 0,
                range: buffer.size,
            })
            .collect();

        let mut writes = vec![accel_write, image_write];
        if !buffer_infos.is_empty() {
            writes.push(
                vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(UNIFORM_BUFFERS_BINDING)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(&buffer_infos)
                    .build(),
            );
        }

        unsafe {
            self.device.logical_device.update_descriptor_sets(&writes, &[]);
        }
    }
}

impl Drop for DescriptorSets {
    fn drop(&mut self) {
        unsafe {
            self.device.logical_device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_without_uniforms() {
        let sizes = pool_sizes(3, 0);
        assert_eq!(sizes.len(), 2);
        assert!(sizes.iter().all(|size| size.descriptor_count == 3));
    }

    #[test]
    fn pool_with_uniforms() {
        let sizes = pool_sizes(3, 3);
        let uniforms = sizes
            .iter()
            .find(|size| size.ty == vk::DescriptorType::UNIFORM_BUFFER)
            .unwrap();
        assert_eq!(uniforms.descriptor_count, 9);
    }

    #[test]
    fn bindings_are_numbered() {
        let stages = vk::ShaderStageFlags::RAYGEN_NV;
        assert_eq!(acceleration_structure_binding(stages).binding, 0);
        assert_eq!(output_image_binding(stages).binding, 1);

        let uniforms = uniform_buffers_binding(3, vk::ShaderStageFlags::CLOSEST_HIT_NV);
        assert_eq!(uniforms.binding, 2);
        assert_eq!(uniforms.descriptor_count, 3);
        assert_eq!(uniforms.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
    }
}
