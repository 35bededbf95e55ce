use std::collections::HashSet;
use std::os::raw::c_char;
use std::rc::Rc;

use ash::prelude::VkResult;
use ash::vk;

use super::extensions::{self, DeviceFeatures};
use super::instance::VulkanInstance;
use super::rt::raytracing::Raytracing;
use super::swapchain::{SurfaceDefinition, SwapchainSupportDetails};
use crate::error::{Error, Result, VkCheck};
use crate::util::helpers;

pub struct Device {
    pub instance: Rc<VulkanInstance>,
    pub physical_device: vk::PhysicalDevice,
    pub physical_props: vk::PhysicalDeviceProperties,
    pub memory_props: vk::PhysicalDeviceMemoryProperties,
    pub logical_device: ash::Device,
    pub queue_family_indices: QueueFamilyIndices,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub raytracing: Raytracing,
    pub command_pool: vk::CommandPool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub transfer_family: Option<u32>,
    pub compute_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl Device {
    pub fn pick(
        instance: &Rc<VulkanInstance>,
        surface: &SurfaceDefinition,
        features: DeviceFeatures,
    ) -> Result<Device> {
        let (physical_device, physical_props, queue_indices) =
            Device::find_suitable_devices(&instance.instance, surface, features)?;
        let logical_device =
            Device::create_logical_device(&instance.instance, physical_device, &queue_indices, features)?;
        let graphics_family = queue_indices.graphics_family.ok_or(Error::NoSuitableDevice)?;
        let present_family = queue_indices.present_family.ok_or(Error::NoSuitableDevice)?;
        let graphics_queue = unsafe { logical_device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { logical_device.get_device_queue(present_family, 0) };
        let raytracing = Raytracing::new(&instance.instance, physical_device, &logical_device);
        let command_pool = Device::create_command_pool(&logical_device, graphics_family)?;
        let memory_props = unsafe {
            instance
                .instance
                .get_physical_device_memory_properties(physical_device)
        };

        Ok(Device {
            instance: Rc::clone(instance),
            physical_device,
            physical_props,
            memory_props,
            logical_device,
            queue_family_indices: queue_indices,
            graphics_queue,
            present_queue,
            raytracing,
            command_pool,
        })
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.logical_device.device_wait_idle() }.check("vkDeviceWaitIdle")
    }

    pub fn find_memory_type(&self, type_filter: u32, properties: vk::MemoryPropertyFlags) -> Result<u32> {
        find_memory_type_index(&self.memory_props, type_filter, properties).ok_or(
            Error::NoMemoryType {
                type_filter,
                properties,
            },
        )
    }

    pub fn allocate_memory(
        &self,
        requirements: &vk::MemoryRequirements,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<vk::DeviceMemory> {
        let memory_type_index = self.find_memory_type(requirements.memory_type_bits, properties)?;
        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        unsafe { self.logical_device.allocate_memory(&allocate_info, None) }.check("vkAllocateMemory")
    }

    fn find_suitable_devices(
        instance: &ash::Instance,
        surface: &SurfaceDefinition,
        features: DeviceFeatures,
    ) -> Result<(vk::PhysicalDevice, vk::PhysicalDeviceProperties, QueueFamilyIndices)> {
        let devices = unsafe { instance.enumerate_physical_devices() }.check("vkEnumeratePhysicalDevices")?;

        for device in devices {
            let properties = unsafe { instance.get_physical_device_properties(device) };
            let name = helpers::vulkan_str_to_str(&properties.device_name);
            log::info!("Inspecting device {}", name);

            let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };
            let queue_indices = QueueFamilyIndices::from_properties(&queue_families, |idx| {
                let support = unsafe {
                    surface
                        .surface_loader
                        .get_physical_device_surface_support(device, idx, surface.surface)
                };
                present_support(support, idx)
            });
            let swapchain_support = SwapchainSupportDetails::get_for(device, surface)?;
            if Device::device_suitable(instance, device, &queue_indices, &swapchain_support, features)? {
                log::info!("Suitable device: {}", name);

                return Ok((device, properties, queue_indices));
            }
        }

        log::error!("Could not find suitable device!");
        Err(Error::NoSuitableDevice)
    }

    fn device_suitable(
        instance: &ash::Instance,
        device: vk::PhysicalDevice,
        queue_indices: &QueueFamilyIndices,
        swapchain_support: &SwapchainSupportDetails,
        features: DeviceFeatures,
    ) -> Result<bool> {
        if !queue_indices.is_complete() {
            log::info!("\tQueue indices incomplete.");
            return Ok(false);
        }

        if !swapchain_support.adequate() {
            log::info!("\tSwapchain support inadequate.");
            return Ok(false);
        }

        let mut required_extension_names: HashSet<String> = extensions::required_device_extension_names(features)
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        let available_extensions = unsafe { instance.enumerate_device_extension_properties(device) }
            .check("vkEnumerateDeviceExtensionProperties")?;
        for ext in &available_extensions {
            let ext_name = helpers::vulkan_str_to_str(&ext.extension_name);
            required_extension_names.remove(&ext_name);
        }

        if !required_extension_names.is_empty() {
            log::info!("\tNot all required extensions are supported:");
            for ext in &required_extension_names {
                log::info!("\t\t{}", ext);
            }
            return Ok(false);
        }

        Ok(true)
    }

    fn create_logical_device(
        instance: &ash::Instance,
        device: vk::PhysicalDevice,
        queue_indices: &QueueFamilyIndices,
        features: DeviceFeatures,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0_f32];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = queue_indices
            .unique_families()
            .into_iter()
            .map(|queue_family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(queue_family)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect();

        let device_extensions: Vec<*const c_char> = extensions::required_device_extension_names(features)
            .iter()
            .map(|name| name.as_ptr())
            .collect();

        // Enable everything the device supports, descriptor indexing included when asked for
        let mut indexing_features = vk::PhysicalDeviceDescriptorIndexingFeatures::default();
        let mut features2_builder = vk::PhysicalDeviceFeatures2::builder();
        if features.contains(DeviceFeatures::DESCRIPTOR_INDEXING) {
            features2_builder = features2_builder.push_next(&mut indexing_features);
        }
        let mut features2 = features2_builder.build();
        unsafe { instance.get_physical_device_features2(device, &mut features2) };

        let device_create_info = vk::DeviceCreateInfo::builder()
            .push_next(&mut features2)
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extensions);

        unsafe { instance.create_device(device, &device_create_info, None) }.map_err(|result| {
            if result == vk::Result::ERROR_EXTENSION_NOT_PRESENT {
                Error::MissingExtension(String::from(
                    "device creation failed due to missing extension. \
                     Make sure VK_NV_ray_tracing is supported by installed driver!",
                ))
            } else {
                Error::Vulkan {
                    call: "vkCreateDevice",
                    result,
                }
            }
        })
    }

    fn create_command_pool(device: &ash::Device, graphics_family: u32) -> Result<vk::CommandPool> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(graphics_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        unsafe { device.create_command_pool(&create_info, None) }.check("vkCreateCommandPool")
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            self.logical_device.destroy_command_pool(self.command_pool, None);
            self.logical_device.destroy_device(None);
        }
    }
}

pub fn find_memory_type_index(
    memory_props: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> Option<u32> {
    memory_props.memory_types[..memory_props.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(i, mem_type)| (type_filter & (1 << *i)) != 0 && mem_type.property_flags.contains(properties))
        .map(|(i, _)| i as u32)
}

/// A family whose support query fails is treated as unable to present.
fn present_support(support: VkResult<bool>, family: u32) -> bool {
    match support.check("vkGetPhysicalDeviceSurfaceSupportKHR") {
        Ok(supported) => supported,
        Err(e) => {
            log::warn!("Queue family {} treated as non-presenting: {}", family, e);
            false
        }
    }
}

impl QueueFamilyIndices {
    /// Picks graphics first, then prefers dedicated compute and transfer families.
    /// Present goes to the graphics family when it can present.
    pub fn from_properties(
        queue_families: &[vk::QueueFamilyProperties],
        supports_present: impl Fn(u32) -> bool,
    ) -> QueueFamilyIndices {
        let find = |pred: &dyn Fn(vk::QueueFlags) -> bool| {
            queue_families
                .iter()
                .position(|family| family.queue_count > 0 && pred(family.queue_flags))
                .map(|idx| idx as u32)
        };

        let graphics_family = find(&|flags| flags.contains(vk::QueueFlags::GRAPHICS));
        let compute_family = find(&|flags| {
            flags.contains(vk::QueueFlags::COMPUTE) && !flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .or_else(|| find(&|flags| flags.contains(vk::QueueFlags::COMPUTE)));
        let transfer_family = find(&|flags| {
            flags.contains(vk::QueueFlags::TRANSFER)
                && !flags.intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
        })
        .or(compute_family)
        .or(graphics_family);

        let present_family = graphics_family
            .filter(|idx| supports_present(*idx))
            .or_else(|| (0..queue_families.len() as u32).find(|idx| supports_present(*idx)));

        QueueFamilyIndices {
            graphics_family,
            transfer_family,
            compute_family,
            present_family,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some()
            && self.transfer_family.is_some()
            && self.compute_family.is_some()
            && self.present_family.is_some()
    }

    /// Graphics, compute, transfer, present; each family listed once.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = vec![];
        for family in [
            self.graphics_family,
            self.compute_family,
            self.transfer_family,
            self.present_family,
        ]
        .into_iter()
        .flatten()
        {
            if !families.contains(&family) {
                families.push(family);
            }
        }

        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_present_query_is_not_support() {
        assert!(present_support(Ok(true), 0));
        assert!(!present_support(Ok(false), 0));
        assert!(!present_support(Err(vk::Result::ERROR_SURFACE_LOST_KHR), 1));
    }

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn single_universal_family() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER)];
        let indices = QueueFamilyIndices::from_properties(&families, |_| true);

        assert!(indices.is_complete());
        assert_eq!(indices.unique_families(), vec![0]);
    }

    #[test]
    fn dedicated_families_preferred() {
        let families = [
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::TRANSFER),
        ];
        let indices = QueueFamilyIndices::from_properties(&families, |idx| idx == 0);

        assert_eq!(indices.graphics_family, Some(0));
        assert_eq!(indices.compute_family, Some(1));
        assert_eq!(indices.transfer_family, Some(2));
        assert_eq!(indices.present_family, Some(0));
        assert_eq!(indices.unique_families(), vec![0, 1, 2]);
    }

    #[test]
    fn present_falls_back_to_other_family() {
        let families = [
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::TRANSFER),
        ];
        let indices = QueueFamilyIndices::from_properties(&families, |idx| idx == 1);

        assert_eq!(indices.present_family, Some(1));
        assert_eq!(indices.unique_families(), vec![0, 1]);
    }

    #[test]
    fn no_present_support_is_incomplete() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let indices = QueueFamilyIndices::from_properties(&families, |_| false);

        assert!(!indices.is_complete());
    }

    #[test]
    fn memory_type_respects_filter_and_flags() {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = 3;
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        props.memory_types[2].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL
            | vk::MemoryPropertyFlags::HOST_VISIBLE
            | vk::MemoryPropertyFlags::HOST_COHERENT;

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type_index(&props, 0b111, host), Some(1));
        assert_eq!(find_memory_type_index(&props, 0b101, host), Some(2));
        assert_eq!(find_memory_type_index(&props, 0b001, host), None);
        assert_eq!(
            find_memory_type_index(&props, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Some(0)
        );
    }
}
