use ash::vk;
use cgmath::{Matrix4, SquareMatrix};

use crate::engine::tutorial::{Tutorial, TutorialContext};
use crate::error::Result;
use crate::tutorials::common;
use crate::tutorials::common::SceneAccel;
use crate::tutorials::scene::{TRIANGLE_INDICES, TRIANGLE_VERTICES};
use crate::vulkan::rt::instance;

/// One triangle in a BLAS, one identity instance in a TLAS, built once at startup.
pub struct AccelTutorial {
    _scene: SceneAccel,
}

impl Tutorial for AccelTutorial {
    const TITLE: &'static str = "VkRay Tutorial 02: Building Acceleration Structure";

    fn init(ctx: &TutorialContext) -> Result<Self> {
        ctx.device.raytracing.log_properties();

        let scene = create_triangle_scene(ctx)?;
        common::build_scenes(ctx.device, &[&scene])?;

        Ok(AccelTutorial { _scene: scene })
    }
}

/// Triangle BLAS under a single identity instance with culling disabled.
pub fn create_triangle_scene(ctx: &TutorialContext) -> Result<SceneAccel> {
    SceneAccel::new(
        ctx.device,
        &TRIANGLE_VERTICES,
        &TRIANGLE_INDICES,
        vk::GeometryFlagsNV::empty(),
        vk::BuildAccelerationStructureFlagsNV::empty(),
        |blas_handle| {
            vec![instance::geometry_instance(
                instance::transform_rows(Matrix4::identity()),
                0,
                0xff,
                0,
                vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE,
                blas_handle,
            )]
        },
        "Triangle",
    )
}
