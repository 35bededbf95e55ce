use std::ffi::CString;
use std::os::raw::c_char;

use ash::extensions::ext::DebugUtils;
use ash::vk;
use raw_window_handle::HasRawDisplayHandle;

use super::debug;
use crate::error::{Error, Result, VkCheck};
use crate::util::constants::*;
use crate::util::helpers;

pub struct VulkanInstance {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    debug_messenger: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    pub fn new(window: &winit::window::Window, app_name: &str, validation: bool) -> Result<VulkanInstance> {
        let entry = unsafe { ash::Entry::load()? };

        if validation {
            VulkanInstance::log_extensions(&entry)?;
            VulkanInstance::check_validation_layers_support(&entry)?;
        }

        let instance = VulkanInstance::create_instance(&entry, window, app_name, validation)?;
        let debug_messenger = if validation {
            Some(VulkanInstance::setup_debug_callback(&entry, &instance)?)
        } else {
            None
        };

        Ok(VulkanInstance {
            entry,
            instance,
            debug_messenger,
        })
    }

    pub fn debug_utils(&self) -> Option<&DebugUtils> {
        self.debug_messenger.as_ref().map(|(loader, _)| loader)
    }

    fn create_instance(
        entry: &ash::Entry,
        window: &winit::window::Window,
        app_name: &str,
        validation: bool,
    ) -> Result<ash::Instance> {
        let app_name = CString::new(app_name).unwrap_or_default();
        let engine_name = CString::new(ENGINE_NAME).unwrap_or_default();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(APPLICATION_VERSION)
            .engine_name(&engine_name)
            .engine_version(ENGINE_VERSION)
            .api_version(API_VERSION);

        let mut extension_names: Vec<*const c_char> =
            ash_window::enumerate_required_extensions(window.raw_display_handle())
                .check("vkEnumerateInstanceExtensionProperties")?
                .to_vec();
        let layer_names: Vec<*const c_char> = if validation {
            extension_names.push(DebugUtils::name().as_ptr());
            helpers::required_validation_layer_names()
                .iter()
                .map(|name| name.as_ptr())
                .collect()
        } else {
            vec![]
        };

        let mut debug_messenger_create_info = debug::create_messenger_create_info();
        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);
        if validation {
            create_info = create_info.push_next(&mut debug_messenger_create_info);
        }

        unsafe { entry.create_instance(&create_info, None) }.check("vkCreateInstance")
    }

    fn log_extensions(entry: &ash::Entry) -> Result<()> {
        let extensions = entry
            .enumerate_instance_extension_properties(None)
            .check("vkEnumerateInstanceExtensionProperties")?;

        log::debug!("Available instance extensions:");
        for ext in extensions {
            log::debug!("\t{}", helpers::vulkan_str_to_str(&ext.extension_name));
        }

        Ok(())
    }

    fn check_validation_layers_support(entry: &ash::Entry) -> Result<()> {
        let available_layers = entry
            .enumerate_instance_layer_properties()
            .check("vkEnumerateInstanceLayerProperties")?;

        for required_layer_name in helpers::required_validation_layer_names() {
            let required_layer_name = required_layer_name.to_string_lossy();
            let found = available_layers
                .iter()
                .any(|layer| helpers::vulkan_str_to_str(&layer.layer_name) == required_layer_name);
            if !found {
                log::error!("Didn't find required validation layer: {}", required_layer_name);
                return Err(Error::MissingExtension(format!(
                    "validation layer {} is not installed",
                    required_layer_name
                )));
            }
        }

        Ok(())
    }

    fn setup_debug_callback(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<(DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let create_info = debug::create_messenger_create_info();
        let debug_utils_loader = DebugUtils::new(entry, instance);
        let messenger = unsafe { debug_utils_loader.create_debug_utils_messenger(&create_info, None) }
            .check("vkCreateDebugUtilsMessengerEXT")?;

        Ok((debug_utils_loader, messenger))
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug_messenger.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
