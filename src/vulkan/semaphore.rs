use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use crate::error::{Result, VkCheck};
use crate::vulkan::debug;
use crate::vulkan::debug::DebugResource;
use crate::vulkan::device::Device;

pub struct Semaphore {
    device: Rc<Device>,
    semaphore: vk::Semaphore,
    label: String,
}

impl Semaphore {
    pub fn new(device: &Rc<Device>, label: &str) -> Result<Self> {
        let sem_create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.logical_device.create_semaphore(&sem_create_info, None) }
            .check("vkCreateSemaphore")?;
        let ret = Self {
            device: Rc::clone(device),
            semaphore,
            label: String::from(label),
        };

        debug::Object::label(device, &ret);

        Ok(ret)
    }

    pub fn get_semaphore(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl DebugResource for Semaphore {
    fn get_type(&self) -> vk::ObjectType {
        vk::ObjectType::SEMAPHORE
    }

    fn get_handle(&self) -> u64 {
        self.semaphore.as_raw()
    }

    fn get_label(&self) -> &String {
        &self.label
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.logical_device.destroy_semaphore(self.semaphore, None);
        }
    }
}
