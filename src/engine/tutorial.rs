use std::rc::Rc;
use std::time;

use ash::vk;

use crate::error::Result;
use crate::util::config::Config;
use crate::vulkan::device::Device;
use crate::vulkan::extensions::DeviceFeatures;
use crate::vulkan::image::StorageImage;

/// Everything a tutorial may build its resources against.
/// Valid until the next swapchain recreation, which re-initializes the tutorial.
pub struct TutorialContext<'a> {
    pub device: &'a Rc<Device>,
    pub config: &'a Config,
    pub output_image: &'a StorageImage,
    pub extent: vk::Extent2D,
    pub frame_count: usize,
}

/// One raytracing sample. The runner calls `init` once per swapchain, then per frame
/// `update_data_for_frame` followed by `record_command_buffer_for_frame`.
/// Resources are released on drop after the device went idle.
pub trait Tutorial: Sized {
    const TITLE: &'static str;

    fn required_features() -> DeviceFeatures {
        DeviceFeatures::empty()
    }

    fn init(ctx: &TutorialContext) -> Result<Self>;

    /// Host writes for `frame_idx`. Its previous submission has already completed.
    fn update_data_for_frame(&mut self, _frame_idx: usize, _elapsed: time::Duration) -> Result<()> {
        Ok(())
    }

    /// Output image is in `GENERAL` layout and cleared when this is recorded.
    fn record_command_buffer_for_frame(&self, _cmd_buffer: vk::CommandBuffer, _frame_idx: usize) {}
}
