use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use crate::error::{Result, VkCheck};
use crate::vulkan::debug;
use crate::vulkan::debug::DebugResource;
use crate::vulkan::device::Device;

pub struct Fence {
    device: Rc<Device>,
    fence: vk::Fence,
    label: String,
}

impl Fence {
    pub fn new(device: &Rc<Device>, flags: vk::FenceCreateFlags, label: &str) -> Result<Self> {
        let fence_create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe { device.logical_device.create_fence(&fence_create_info, None) }
            .check("vkCreateFence")?;

        let ret = Self {
            device: Rc::clone(device),
            fence,
            label: String::from(label),
        };

        debug::Object::label(device, &ret);

        Ok(ret)
    }

    pub fn get_fence(&self) -> vk::Fence {
        self.fence
    }
}

impl DebugResource for Fence {
    fn get_type(&self) -> vk::ObjectType {
        vk::ObjectType::FENCE
    }

    fn get_handle(&self) -> u64 {
        self.fence.as_raw()
    }

    fn get_label(&self) -> &String {
        &self.label
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.logical_device.destroy_fence(self.fence, None);
        }
    }
}
