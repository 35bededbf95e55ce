use std::ffi::CStr;

use ash::extensions::khr::Swapchain;
use ash::extensions::nv::RayTracing;
use ash::vk;

bitflags::bitflags! {
    /// Optional device capabilities a tutorial asks for on top of raytracing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceFeatures: u32 {
        const DESCRIPTOR_INDEXING = 0b0000_0001;
    }
}

pub fn required_device_extension_names(features: DeviceFeatures) -> Vec<&'static CStr> {
    let mut names = vec![
        Swapchain::name(),
        RayTracing::name(),
        vk::KhrGetMemoryRequirements2Fn::name(),
    ];

    if features.contains(DeviceFeatures::DESCRIPTOR_INDEXING) {
        names.push(vk::ExtDescriptorIndexingFn::name());
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(features: DeviceFeatures) -> Vec<String> {
        required_device_extension_names(features)
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn base_extensions() {
        assert_eq!(
            names(DeviceFeatures::empty()),
            vec![
                "VK_KHR_swapchain",
                "VK_NV_ray_tracing",
                "VK_KHR_get_memory_requirements2"
            ]
        );
    }

    #[test]
    fn descriptor_indexing_appended() {
        let names = names(DeviceFeatures::DESCRIPTOR_INDEXING);
        assert_eq!(names.len(), 4);
        assert_eq!(names[3], "VK_EXT_descriptor_indexing");
    }
}
