use ash::vk;

use crate::engine::tutorial::{Tutorial, TutorialContext};
use crate::error::Result;
use crate::tutorials::common;
use crate::tutorials::common::SceneAccel;
use crate::tutorials::scene;
use crate::tutorials::scene::{ICOSAHEDRON_INDICES, INSTANCE_COLORS, INSTANCE_COUNT};
use crate::vulkan::extensions::DeviceFeatures;
use crate::vulkan::mem::{Buffer, StructBufferData};
use crate::vulkan::rt::descriptors;
use crate::vulkan::rt::descriptors::DescriptorSets;
use crate::vulkan::rt::instance;
use crate::vulkan::rt::pipeline::{RtPipeline, ShaderGroup};
use crate::vulkan::rt::sbt::{SbtRecord, SbtRegion, SbtSection, ShaderBindingTable};
use crate::vulkan::shader::{ShaderModule, ShaderStage};

const SHADER_NAME: &str = "rt_10_shaders";

/// Three icosahedron instances. Each picks its hit record through its SBT offset and
/// its uniform buffer through its custom index.
pub struct InstanceResourcesTutorial {
    descriptor_sets: DescriptorSets,
    sbt: ShaderBindingTable,
    pipeline: RtPipeline,
    _uniform_buffers: Vec<Buffer>,
    _scene: SceneAccel,
    extent: vk::Extent2D,
}

impl Tutorial for InstanceResourcesTutorial {
    const TITLE: &'static str = "VkRay Tutorial 10: Instance resources";

    fn required_features() -> DeviceFeatures {
        DeviceFeatures::DESCRIPTOR_INDEXING
    }

    fn init(ctx: &TutorialContext) -> Result<Self> {
        let scene = SceneAccel::new(
            ctx.device,
            &scene::icosahedron_vertices(),
            &ICOSAHEDRON_INDICES,
            vk::GeometryFlagsNV::OPAQUE,
            vk::BuildAccelerationStructureFlagsNV::empty(),
            |blas_handle| {
                (0..INSTANCE_COUNT)
                    .map(|i| {
                        instance::geometry_instance(
                            instance::transform_rows(scene::instance_transform(i)),
                            i,
                            0xff,
                            i,
                            vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE,
                            blas_handle,
                        )
                    })
                    .collect()
            },
            "Icosahedron",
        )?;
        common::build_scenes(ctx.device, &[&scene])?;

        let uniform_buffers = INSTANCE_COLORS
            .iter()
            .enumerate()
            .map(|(i, color)| {
                Buffer::new_host_visible_coherent(
                    ctx.device,
                    &StructBufferData::new(color),
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    &format!("Instance {} color", i),
                )
            })
            .collect::<Result<Vec<Buffer>>>()?;

        let pipeline = create_pipeline(ctx)?;
        let sbt = ShaderBindingTable::new(ctx.device, &pipeline, sbt_sections())?;

        let descriptor_sets = DescriptorSets::new(
            ctx.device,
            pipeline.descriptor_set_layout,
            ctx.frame_count as u32,
            INSTANCE_COUNT,
            Some(INSTANCE_COUNT),
        )?;
        let uniforms: Vec<&Buffer> = uniform_buffers.iter().collect();
        for i in 0..descriptor_sets.len() {
            descriptor_sets.write(i, &scene.tlas, ctx.output_image.view, &uniforms);
        }

        Ok(InstanceResourcesTutorial {
            descriptor_sets,
            sbt,
            pipeline,
            _uniform_buffers: uniform_buffers,
            _scene: scene,
            extent: ctx.extent,
        })
    }

    fn record_command_buffer_for_frame(&self, cmd_buffer: vk::CommandBuffer, frame_idx: usize) {
        self.pipeline.cmd_bind(cmd_buffer, self.descriptor_sets.get(frame_idx));
        self.sbt
            .cmd_trace_rays(cmd_buffer, self.extent.width, self.extent.height);
    }
}

/// Stages: raygen, miss, closest hit. Uniform buffer array has a variable count bounded by the instance count.
fn create_pipeline(ctx: &TutorialContext) -> Result<RtPipeline> {
    let dir = ctx.config.shader_dir.as_path();
    let stages = [
        ShaderModule::load(ctx.device, dir, SHADER_NAME, ShaderStage::Raygen)?,
        ShaderModule::load(ctx.device, dir, SHADER_NAME, ShaderStage::Miss)?,
        ShaderModule::load(ctx.device, dir, SHADER_NAME, ShaderStage::ClosestHit)?,
    ];
    let groups = [
        ShaderGroup::General(0),
        ShaderGroup::General(1),
        ShaderGroup::TrianglesHit {
            closest_hit: 2,
            any_hit: None,
        },
    ];
    let bindings = [
        descriptors::acceleration_structure_binding(vk::ShaderStageFlags::RAYGEN_NV),
        descriptors::output_image_binding(vk::ShaderStageFlags::RAYGEN_NV),
        descriptors::uniform_buffers_binding(INSTANCE_COUNT, vk::ShaderStageFlags::CLOSEST_HIT_NV),
    ];
    let binding_flags = [
        vk::DescriptorBindingFlags::empty(),
        vk::DescriptorBindingFlags::empty(),
        vk::DescriptorBindingFlags::VARIABLE_DESCRIPTOR_COUNT,
    ];

    RtPipeline::new(ctx.device, &stages, &groups, &bindings, &binding_flags, 1, SHADER_NAME)
}

/// `| raygen | miss | hit + colour | hit + colour | hit + colour |`
fn sbt_sections() -> Vec<SbtSection> {
    let hit_records = (0..INSTANCE_COUNT)
        .map(|i| {
            let color: Vec<u8> = scene::inline_color(i).iter().flat_map(|c| c.to_ne_bytes()).collect();
            SbtRecord::with_data(2, &color)
        })
        .collect();

    vec![
        SbtSection {
            region: SbtRegion::Raygen,
            records: vec![SbtRecord::new(0)],
        },
        SbtSection {
            region: SbtRegion::Miss,
            records: vec![SbtRecord::new(1)],
        },
        SbtSection {
            region: SbtRegion::Hit,
            records: hit_records,
        },
    ]
}

#[cfg(test)]
mod tests {
    use crate::vulkan::rt::sbt::SbtLayout;

    use super::*;

    #[test]
    fn one_hit_record_per_instance() {
        let sections = sbt_sections();
        let hits = &sections[2];
        assert_eq!(hits.region, SbtRegion::Hit);
        assert_eq!(hits.records.len(), INSTANCE_COUNT as usize);
        assert!(hits.records.iter().all(|r| r.group == 2 && r.inline_data.len() == 16));
    }

    #[test]
    fn hit_records_carry_colours() {
        let layout = SbtLayout::new(16, 16, sbt_sections());
        let handles = [0u8; 48];
        let table = layout.write(&handles);

        let hit = layout.region(SbtRegion::Hit).unwrap();
        let second = (hit.offset + hit.stride) as usize + 16;
        let green = f32::from_ne_bytes([table[second + 4], table[second + 5], table[second + 6], table[second + 7]]);
        assert_eq!(green, 0.5);
    }
}
