use std::rc::Rc;

use ash::vk;

use super::device::Device;
use crate::error::{Result, VkCheck};

/// One-shot command buffer for setup work. `submit` blocks until the queue is idle.
pub struct SingleTimeCmdBuffer<'a> {
    device: &'a Device,
    cmd_buffers: Vec<vk::CommandBuffer>,
}

impl<'a> SingleTimeCmdBuffer<'a> {
    pub fn begin(device: &'a Device) -> Result<SingleTimeCmdBuffer<'a>> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_pool(device.command_pool)
            .command_buffer_count(1);

        let cmd_buffers = unsafe { device.logical_device.allocate_command_buffers(&allocate_info) }
            .check("vkAllocateCommandBuffers")?;
        let ret = SingleTimeCmdBuffer { device, cmd_buffers };

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.logical_device.begin_command_buffer(ret.get_cmd_buffer(), &begin_info) }
            .check("vkBeginCommandBuffer")?;

        Ok(ret)
    }

    pub fn get_cmd_buffer(&self) -> vk::CommandBuffer {
        self.cmd_buffers[0]
    }

    pub fn submit(self) -> Result<()> {
        let submit_infos = [vk::SubmitInfo::builder().command_buffers(&self.cmd_buffers).build()];
        let logical_device = &self.device.logical_device;

        unsafe {
            logical_device.end_command_buffer(self.get_cmd_buffer()).check("vkEndCommandBuffer")?;
            logical_device
                .queue_submit(self.device.graphics_queue, &submit_infos, vk::Fence::null())
                .check("vkQueueSubmit")?;
            logical_device.queue_wait_idle(self.device.graphics_queue).check("vkQueueWaitIdle")
        }
    }
}

impl<'a> Drop for SingleTimeCmdBuffer<'a> {
    fn drop(&mut self) {
        unsafe {
            self.device
                .logical_device
                .free_command_buffers(self.device.command_pool, &self.cmd_buffers);
        }
    }
}

/// Per-frame command buffers, reset and re-recorded every frame.
pub struct FrameCmdBuffers {
    device: Rc<Device>,
    cmd_buffers: Vec<vk::CommandBuffer>,
}

impl FrameCmdBuffers {
    pub fn new(device: &Rc<Device>, count: usize) -> Result<FrameCmdBuffers> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(device.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);

        let cmd_buffers = unsafe { device.logical_device.allocate_command_buffers(&allocate_info) }
            .check("vkAllocateCommandBuffers")?;

        Ok(FrameCmdBuffers {
            device: Rc::clone(device),
            cmd_buffers,
        })
    }

    pub fn begin(&self, frame_idx: usize) -> Result<vk::CommandBuffer> {
        let cmd_buffer = self.cmd_buffers[frame_idx];
        unsafe {
            self.device
                .logical_device
                .reset_command_buffer(cmd_buffer, vk::CommandBufferResetFlags::empty())
                .check("vkResetCommandBuffer")?;
            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .logical_device
                .begin_command_buffer(cmd_buffer, &begin_info)
                .check("vkBeginCommandBuffer")?;
        }

        Ok(cmd_buffer)
    }

    pub fn end(&self, frame_idx: usize) -> Result<()> {
        unsafe { self.device.logical_device.end_command_buffer(self.cmd_buffers[frame_idx]) }
            .check("vkEndCommandBuffer")
    }
}

impl Drop for FrameCmdBuffers {
    fn drop(&mut self) {
        unsafe {
            self.device
                .logical_device
                .free_command_buffers(self.device.command_pool, &self.cmd_buffers);
        }
    }
}
