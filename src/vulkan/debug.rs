use std::ffi::{CStr, CString};
use std::os::raw::c_void;

use ash::extensions::ext::DebugUtils;
use ash::vk;

use super::device::Device;

pub trait DebugResource {
    fn get_type(&self) -> vk::ObjectType;
    fn get_handle(&self) -> u64;
    fn get_label(&self) -> &String;
}

/// Named command buffer region, visible in capture tools. Closed on drop.
pub struct Region<'a> {
    cmd_buffer: vk::CommandBuffer,
    debug_utils: &'a DebugUtils,
}

impl<'a> Region<'a> {
    pub fn new(device: &'a Device, cmd_buffer: vk::CommandBuffer, label: &str) -> Option<Region<'a>> {
        let debug_utils = device.instance.debug_utils()?;
        let name = CString::new(label).ok()?;
        let label = vk::DebugUtilsLabelEXT::builder().label_name(&name).build();
        unsafe { debug_utils.cmd_begin_debug_utils_label(cmd_buffer, &label) };

        Some(Region {
            cmd_buffer,
            debug_utils,
        })
    }
}

impl<'a> Drop for Region<'a> {
    fn drop(&mut self) {
        unsafe { self.debug_utils.cmd_end_debug_utils_label(self.cmd_buffer) };
    }
}

pub struct Object {}

impl Object {
    /// Attaches a type-prefixed name to the object. No-op without validation.
    pub fn label(device: &Device, resource: &dyn DebugResource) {
        let debug_utils = match device.instance.debug_utils() {
            Some(debug_utils) => debug_utils,
            None => return,
        };

        let full_label = object_label(resource.get_type(), resource.get_label());
        let name = match CString::new(full_label) {
            Ok(name) => name,
            Err(_) => {
                log::warn!("Debug label contains nul byte: {}", resource.get_label());
                return;
            }
        };
        let name_info = vk::DebugUtilsObjectNameInfoEXT::builder()
            .object_type(resource.get_type())
            .object_handle(resource.get_handle())
            .object_name(&name)
            .build();

        let result = unsafe {
            debug_utils.set_debug_utils_object_name(device.logical_device.handle(), &name_info)
        };
        if let Err(e) = result {
            log::warn!("Failed to set debug name {}: {}", resource.get_label(), e);
        }
    }
}

fn object_label(object_type: vk::ObjectType, label: &str) -> String {
    let prefix = match object_type {
        vk::ObjectType::ACCELERATION_STRUCTURE_NV => "AccelerationStructure:",
        vk::ObjectType::BUFFER => "Buffer:",
        vk::ObjectType::DEVICE_MEMORY => "Memory:",
        vk::ObjectType::DESCRIPTOR_SET => "DescriptorSet:",
        vk::ObjectType::FENCE => "Fence:",
        vk::ObjectType::IMAGE => "Image:",
        vk::ObjectType::IMAGE_VIEW => "ImageView:",
        vk::ObjectType::PIPELINE_LAYOUT => "PipelineLayout:",
        vk::ObjectType::PIPELINE => "Pipeline:",
        vk::ObjectType::SEMAPHORE => "Semaphore:",
        vk::ObjectType::SHADER_MODULE => "Shader:",
        _ => {
            log::warn!("Tried to set label for vk object of unknown type");
            "UnknownType:"
        }
    };

    String::from(prefix) + label
}

pub fn create_messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
        )
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
        .build()
}

pub unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let types = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "[General]",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "[Performance]",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "[Validation]",
        _ => "[Unknown]",
    };
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE => log::debug!("{}{}", types, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("{}{}", types, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("{}{}", types, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::info!("{}{}", types, message),
        _ => log::debug!("{}{}", types, message),
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_prefixed_by_type() {
        assert_eq!(object_label(vk::ObjectType::BUFFER, "Vertices"), "Buffer:Vertices");
        assert_eq!(
            object_label(vk::ObjectType::ACCELERATION_STRUCTURE_NV, "BLAS"),
            "AccelerationStructure:BLAS"
        );
        assert_eq!(object_label(vk::ObjectType::QUERY_POOL, "Q"), "UnknownType:Q");
    }

    #[test]
    fn messenger_reports_errors_and_warnings() {
        let info = create_messenger_create_info();
        assert!(info
            .message_severity
            .contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
        assert!(info.pfn_user_callback.is_some());
    }
}
