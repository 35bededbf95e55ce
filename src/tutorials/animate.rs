use std::rc::Rc;
use std::time;

use ash::vk;

use crate::engine::tutorial::{Tutorial, TutorialContext};
use crate::error::Result;
use crate::tutorials::common;
use crate::tutorials::common::SceneAccel;
use crate::tutorials::scene;
use crate::tutorials::scene::TRIANGLE_INDICES;
use crate::tutorials::shaders::{create_pipeline, create_shader_binding_table};
use crate::vulkan::device::Device;
use crate::vulkan::mem::Buffer;
use crate::vulkan::rt::descriptors::DescriptorSets;
use crate::vulkan::rt::instance;
use crate::vulkan::rt::instance::GeometryInstance;
use crate::vulkan::rt::pipeline::RtPipeline;
use crate::vulkan::rt::sbt::ShaderBindingTable;

/// Animated triangle. Each buffered frame owns its geometry and structures,
/// which are rewritten and refitted when that frame is recorded again.
pub struct AnimateTutorial {
    device: Rc<Device>,
    descriptor_sets: DescriptorSets,
    sbt: ShaderBindingTable,
    pipeline: RtPipeline,
    frames: Vec<SceneAccel>,
    scratch: Buffer,
    extent: vk::Extent2D,
}

fn animated_instance(t: f32, blas_handle: u64) -> GeometryInstance {
    instance::geometry_instance(
        instance::transform_rows(scene::animated_transform(t)),
        0,
        0xff,
        0,
        vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE,
        blas_handle,
    )
}

impl Tutorial for AnimateTutorial {
    const TITLE: &'static str = "VkRay Tutorial 08: Animate and refit";

    fn init(ctx: &TutorialContext) -> Result<Self> {
        let frames = (0..ctx.frame_count)
            .map(|i| {
                SceneAccel::new(
                    ctx.device,
                    &scene::animated_triangle(0.0),
                    &TRIANGLE_INDICES,
                    vk::GeometryFlagsNV::empty(),
                    vk::BuildAccelerationStructureFlagsNV::ALLOW_UPDATE,
                    |blas_handle| vec![animated_instance(0.0, blas_handle)],
                    &format!("Frame {}", i),
                )
            })
            .collect::<Result<Vec<SceneAccel>>>()?;
        let frame_refs: Vec<&SceneAccel> = frames.iter().collect();
        let scratch = common::build_scenes(ctx.device, &frame_refs)?;

        let pipeline = create_pipeline(ctx, false)?;
        let sbt = create_shader_binding_table(ctx.device, &pipeline)?;

        let descriptor_sets =
            DescriptorSets::new(ctx.device, pipeline.descriptor_set_layout, frames.len() as u32, 0, None)?;
        for (i, frame) in frames.iter().enumerate() {
            descriptor_sets.write(i, &frame.tlas, ctx.output_image.view, &[]);
        }

        Ok(AnimateTutorial {
            device: Rc::clone(ctx.device),
            descriptor_sets,
            sbt,
            pipeline,
            frames,
            scratch,
            extent: ctx.extent,
        })
    }

    fn update_data_for_frame(&mut self, frame_idx: usize, elapsed: time::Duration) -> Result<()> {
        let t = scene::animation_time(elapsed);
        let frame = &self.frames[frame_idx];

        frame.update_vertices(&scene::animated_triangle(t))?;
        frame.update_instances(&[animated_instance(t, frame.blas.handle)])
    }

    fn record_command_buffer_for_frame(&self, cmd_buffer: vk::CommandBuffer, frame_idx: usize) {
        let frame = &self.frames[frame_idx];
        frame.cmd_build(&self.device, cmd_buffer, true, &self.scratch);

        self.pipeline.cmd_bind(cmd_buffer, self.descriptor_sets.get(frame_idx));
        self.sbt
            .cmd_trace_rays(cmd_buffer, self.extent.width, self.extent.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_follows_rotation() {
        let t = 0.25f32;
        let record = animated_instance(t, 42);
        let m = record.transform.matrix;

        assert!((m[0] - t.cos()).abs() < 1e-6);
        assert!((m[1] + t.sin()).abs() < 1e-6);
        assert!((m[4] - t.sin()).abs() < 1e-6);
        assert_eq!(m[3], 0.0);
        assert_eq!(record.instance_custom_index_and_mask.high_8(), 0xff);
        assert_eq!(unsafe { record.acceleration_structure_reference.device_handle }, 42);
    }
}
