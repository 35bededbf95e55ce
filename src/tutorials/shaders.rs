use std::rc::Rc;

use ash::vk;

use crate::engine::tutorial::{Tutorial, TutorialContext};
use crate::error::Result;
use crate::tutorials::accel::create_triangle_scene;
use crate::tutorials::common;
use crate::tutorials::common::SceneAccel;
use crate::vulkan::device::Device;
use crate::vulkan::rt::descriptors;
use crate::vulkan::rt::descriptors::DescriptorSets;
use crate::vulkan::rt::pipeline::{RtPipeline, ShaderGroup};
use crate::vulkan::rt::sbt::{SbtRecord, SbtRegion, SbtSection, ShaderBindingTable};
use crate::vulkan::shader::{ShaderModule, ShaderStage};

const SHADER_NAME: &str = "rt_06_shaders";

/// Triangle traced with raygen, closest-hit + any-hit and miss shaders.
pub struct ShadersTutorial {
    descriptor_sets: DescriptorSets,
    sbt: ShaderBindingTable,
    pipeline: RtPipeline,
    _scene: SceneAccel,
    extent: vk::Extent2D,
}

impl Tutorial for ShadersTutorial {
    const TITLE: &'static str = "VkRay Tutorial 06: Shaders";

    fn init(ctx: &TutorialContext) -> Result<Self> {
        let scene = create_triangle_scene(ctx)?;
        common::build_scenes(ctx.device, &[&scene])?;

        let pipeline = create_pipeline(ctx, true)?;
        let sbt = create_shader_binding_table(ctx.device, &pipeline)?;

        let descriptor_sets =
            DescriptorSets::new(ctx.device, pipeline.descriptor_set_layout, ctx.frame_count as u32, 0, None)?;
        for i in 0..descriptor_sets.len() {
            descriptor_sets.write(i, &scene.tlas, ctx.output_image.view, &[]);
        }

        Ok(ShadersTutorial {
            descriptor_sets,
            sbt,
            pipeline,
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

/// Stages: raygen, closest hit, optional any hit, miss.
/// Groups: raygen, triangle hit group, miss.
pub fn create_pipeline(ctx: &TutorialContext, any_hit: bool) -> Result<RtPipeline> {
    let dir = ctx.config.shader_dir.as_path();
    let mut stages = vec![
        ShaderModule::load(ctx.device, dir, SHADER_NAME, ShaderStage::Raygen)?,
        ShaderModule::load(ctx.device, dir, SHADER_NAME, ShaderStage::ClosestHit)?,
    ];
    if any_hit {
        stages.push(ShaderModule::load(ctx.device, dir, SHADER_NAME, ShaderStage::AnyHit)?);
    }
    stages.push(ShaderModule::load(ctx.device, dir, SHADER_NAME, ShaderStage::Miss)?);

    let miss_stage = stages.len() as u32 - 1;
    let groups = [
        ShaderGroup::General(0),
        ShaderGroup::TrianglesHit {
            closest_hit: 1,
            any_hit: if any_hit { Some(2) } else { None },
        },
        ShaderGroup::General(miss_stage),
    ];
    let bindings = [
        descriptors::acceleration_structure_binding(vk::ShaderStageFlags::RAYGEN_NV),
        descriptors::output_image_binding(vk::ShaderStageFlags::RAYGEN_NV),
    ];

    RtPipeline::new(ctx.device, &stages, &groups, &bindings, &[], 1, SHADER_NAME)
}

/// `| raygen | hit | miss |`, one record each.
pub fn create_shader_binding_table(device: &Rc<Device>, pipeline: &RtPipeline) -> Result<ShaderBindingTable> {
    let sections = vec![
        SbtSection {
            region: SbtRegion::Raygen,
            records: vec![SbtRecord::new(0)],
        },
        SbtSection {
            region: SbtRegion::Hit,
            records: vec![SbtRecord::new(1)],
        },
        SbtSection {
            region: SbtRegion::Miss,
            records: vec![SbtRecord::new(2)],
        },
    ];

    ShaderBindingTable::new(device, pipeline, sections)
}
