use std::rc::Rc;

use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

use crate::error::{Result, VkCheck};
use crate::vulkan::device::Device;
use crate::vulkan::extensions::DeviceFeatures;
use crate::vulkan::instance::VulkanInstance;
use crate::vulkan::swapchain::{SurfaceDefinition, Swapchain};

/// Instance, surface and device for one window. Field order is drop order.
pub struct Entry {
    swapchain: Option<Swapchain>,
    device: Rc<Device>,
    surface: SurfaceDefinition,
    _instance: Rc<VulkanInstance>,
}

impl Entry {
    pub fn new(
        window: &winit::window::Window,
        app_name: &str,
        features: DeviceFeatures,
        validation: bool,
    ) -> Result<Self> {
        let instance = Rc::new(VulkanInstance::new(window, app_name, validation)?);
        let surface = Entry::create_surface(&instance, window)?;
        let device = Rc::new(Device::pick(&instance, &surface, features)?);
        let swapchain = Swapchain::new(
            &device,
            &surface,
            window.inner_size().width,
            window.inner_size().height,
            None,
        )?;

        Ok(Entry {
            swapchain: Some(swapchain),
            device,
            surface,
            _instance: instance,
        })
    }

    pub fn get_device(&self) -> &Rc<Device> {
        &self.device
    }

    pub fn get_swapchain(&self) -> Option<&Swapchain> {
        self.swapchain.as_ref()
    }

    pub fn get_mut_swapchain(&mut self) -> Option<&mut Swapchain> {
        self.swapchain.as_mut()
    }

    /// Old swapchain is retired into the new one, then destroyed.
    pub fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        let old = self.swapchain.take();
        let swapchain = Swapchain::new(
            &self.device,
            &self.surface,
            width,
            height,
            old.as_ref().map(|swapchain| swapchain.swapchain),
        )?;
        drop(old);
        self.swapchain = Some(swapchain);

        Ok(())
    }

    fn create_surface(instance: &VulkanInstance, window: &winit::window::Window) -> Result<SurfaceDefinition> {
        let surface = unsafe {
            ash_window::create_surface(
                &instance.entry,
                &instance.instance,
                window.raw_display_handle(),
                window.raw_window_handle(),
                None,
            )
        }
        .check("vkCreateSurfaceKHR")?;
        let surface_loader = ash::extensions::khr::Surface::new(&instance.entry, &instance.instance);

        Ok(SurfaceDefinition {
            surface_loader,
            surface,
        })
    }
}
