use std::rc::Rc;

use crate::engine::tutorial::{Tutorial, TutorialContext};
use crate::error::Result;
use crate::vulkan::device::Device;

/// Device with raytracing support. Traces nothing; the window shows the cleared image.
pub struct InitTutorial {
    _device: Rc<Device>,
}

impl Tutorial for InitTutorial {
    const TITLE: &'static str = "VkRay Tutorial 01: Initialization";

    fn init(ctx: &TutorialContext) -> Result<Self> {
        ctx.device.raytracing.log_properties();

        Ok(InitTutorial {
            _device: Rc::clone(ctx.device),
        })
    }
}
