use std::rc::Rc;

use ash::vk;

use super::device::Device;
use super::fence::Fence;
use super::semaphore::Semaphore;
use crate::error::{Error, Result, VkCheck};
use crate::util::constants::FRAMES_IN_FLIGHT;

pub struct SurfaceDefinition {
    pub surface_loader: ash::extensions::khr::Surface,
    pub surface: vk::SurfaceKHR,
}

impl Drop for SurfaceDefinition {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

pub struct SwapchainSupportDetails {
    capabilities: vk::SurfaceCapabilitiesKHR,
    formats: Vec<vk::SurfaceFormatKHR>,
    present_modes: Vec<vk::PresentModeKHR>,
}

pub struct Swapchain {
    device: Rc<Device>,
    pub current_frame: usize,
    pub loader: ash::extensions::khr::Swapchain,
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    image_available_sems: Vec<Semaphore>,
    render_finished_sems: Vec<Semaphore>,
    in_flight_fences: Vec<Fence>,
    in_flight_images: Vec<Option<vk::Fence>>,
}

impl SwapchainSupportDetails {
    pub fn get_for(
        physical_device: vk::PhysicalDevice,
        surface: &SurfaceDefinition,
    ) -> Result<SwapchainSupportDetails> {
        unsafe {
            let capabilities = surface
                .surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface.surface)
                .check("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
            let formats = surface
                .surface_loader
                .get_physical_device_surface_formats(physical_device, surface.surface)
                .check("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
            let present_modes = surface
                .surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface.surface)
                .check("vkGetPhysicalDeviceSurfacePresentModesKHR")?;

            Ok(SwapchainSupportDetails {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    pub fn adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }

    /// Linear BGRA8 is preferred since the raytraced image is written without gamma.
    pub fn choose_format(&self) -> Option<vk::SurfaceFormatKHR> {
        self.formats
            .iter()
            .find(|fmt| {
                fmt.format == vk::Format::B8G8R8A8_UNORM
                    && fmt.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
            .or_else(|| self.formats.first())
            .copied()
    }

    pub fn choose_present_mode(&self) -> vk::PresentModeKHR {
        if self.present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
            vk::PresentModeKHR::MAILBOX
        } else {
            vk::PresentModeKHR::FIFO
        }
    }

    pub fn choose_extent(&self, width: u32, height: u32) -> vk::Extent2D {
        if self.capabilities.current_extent.width != u32::MAX {
            self.capabilities.current_extent
        } else {
            use num::clamp;
            vk::Extent2D {
                width: clamp(
                    width,
                    self.capabilities.min_image_extent.width,
                    self.capabilities.max_image_extent.width,
                ),
                height: clamp(
                    height,
                    self.capabilities.min_image_extent.height,
                    self.capabilities.max_image_extent.height,
                ),
            }
        }
    }

    pub fn choose_image_count(&self) -> u32 {
        let wanted = self.capabilities.min_image_count + 1;
        if self.capabilities.max_image_count > 0 {
            wanted.min(self.capabilities.max_image_count)
        } else {
            wanted
        }
    }
}

impl Swapchain {
    pub fn new(
        device: &Rc<Device>,
        surface: &SurfaceDefinition,
        width: u32,
        height: u32,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Swapchain> {
        let swapchain_support = SwapchainSupportDetails::get_for(device.physical_device, surface)?;
        let extent = swapchain_support.choose_extent(width, height);
        let format = swapchain_support.choose_format().ok_or(Error::NoSuitableDevice)?;
        let present_mode = swapchain_support.choose_present_mode();
        let image_count = swapchain_support.choose_image_count();

        let queue_indices = &device.queue_family_indices;
        let queue_family_indices: Vec<u32> = match (queue_indices.graphics_family, queue_indices.present_family) {
            (Some(graphics), Some(present)) if graphics != present => vec![graphics, present],
            _ => vec![],
        };
        let image_sharing_mode = if queue_family_indices.is_empty() {
            vk::SharingMode::EXCLUSIVE
        } else {
            vk::SharingMode::CONCURRENT
        };

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_color_space(format.color_space)
            .image_format(format.format)
            .image_extent(extent)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(image_sharing_mode)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(swapchain_support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or_default())
            .image_array_layers(1);

        let swapchain_loader = ash::extensions::khr::Swapchain::new(&device.instance.instance, &device.logical_device);
        let swapchain = unsafe { swapchain_loader.create_swapchain(&swapchain_create_info, None) }
            .check("vkCreateSwapchainKHR")?;
        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }.check("vkGetSwapchainImagesKHR")?;

        let mut image_available_sems = vec![];
        let mut render_finished_sems = vec![];
        let mut in_flight_fences = vec![];
        for i in 0..FRAMES_IN_FLIGHT {
            image_available_sems.push(Semaphore::new(device, &format!("ImageAvailable{}", i))?);
            render_finished_sems.push(Semaphore::new(device, &format!("RenderFinished{}", i))?);
            in_flight_fences.push(Fence::new(device, vk::FenceCreateFlags::SIGNALED, &format!("InFlight{}", i))?);
        }

        let in_flight_images = vec![None; images.len()];

        log::info!(
            "Swapchain created: {}x{}, {} images, {:?}",
            extent.width,
            extent.height,
            images.len(),
            format.format
        );

        Ok(Swapchain {
            device: Rc::clone(device),
            current_frame: 0,
            loader: swapchain_loader,
            swapchain,
            images,
            format: format.format,
            extent,
            image_available_sems,
            render_finished_sems,
            in_flight_fences,
            in_flight_images,
        })
    }

    /// Waits until the current frame slot is free and acquires the next image.
    /// Returns `None` when the swapchain is out of date.
    pub fn acquire_next_image(&mut self) -> Result<Option<u32>> {
        let fences = [self.in_flight_fences[self.current_frame].get_fence()];
        unsafe { self.device.logical_device.wait_for_fences(&fences, true, u64::MAX) }.check("vkWaitForFences")?;

        let acquired = unsafe {
            self.loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.image_available_sems[self.current_frame].get_semaphore(),
                vk::Fence::null(),
            )
        };
        let image_idx = match acquired {
            Ok((idx, _)) => idx,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => return Ok(None),
            Err(result) => {
                return Err(Error::Vulkan {
                    call: "vkAcquireNextImageKHR",
                    result,
                })
            }
        };

        if let Some(fence) = self.in_flight_images[image_idx as usize] {
            unsafe { self.device.logical_device.wait_for_fences(&[fence], true, u64::MAX) }
                .check("vkWaitForFences")?;
        }
        self.in_flight_images[image_idx as usize] = Some(self.in_flight_fences[self.current_frame].get_fence());

        Ok(Some(image_idx))
    }

    pub fn submit(&self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let wait_semaphores = [self.image_available_sems[self.current_frame].get_semaphore()];
        let signal_semaphores = [self.render_finished_sems[self.current_frame].get_semaphore()];
        let wait_stages = [vk::PipelineStageFlags::TRANSFER];
        let cmd_buffers = [command_buffer];
        let submit_infos = [vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&cmd_buffers)
            .signal_semaphores(&signal_semaphores)
            .build()];

        let fence = self.in_flight_fences[self.current_frame].get_fence();
        unsafe {
            self.device.logical_device.reset_fences(&[fence]).check("vkResetFences")?;
            self.device
                .logical_device
                .queue_submit(self.device.graphics_queue, &submit_infos, fence)
                .check("vkQueueSubmit")
        }
    }

    /// Returns true when the swapchain has to be recreated.
    pub fn present(&mut self, image_idx: u32) -> Result<bool> {
        let wait_semaphores = [self.render_finished_sems[self.current_frame].get_semaphore()];
        let swapchains = [self.swapchain];
        let image_indices = [image_idx];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        self.current_frame = (self.current_frame + 1) % FRAMES_IN_FLIGHT;

        match unsafe { self.loader.queue_present(self.device.present_queue, &present_info) } {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(result) => Err(Error::Vulkan {
                call: "vkQueuePresentKHR",
                result,
            }),
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(formats: Vec<vk::SurfaceFormatKHR>, present_modes: Vec<vk::PresentModeKHR>) -> SwapchainSupportDetails {
        SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 0,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D {
                    width: 1920,
                    height: 1080,
                },
                ..Default::default()
            },
            formats,
            present_modes,
        }
    }

    fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn prefers_unorm_bgra() {
        let support = details(
            vec![format(vk::Format::R8G8B8A8_SRGB), format(vk::Format::B8G8R8A8_UNORM)],
            vec![vk::PresentModeKHR::FIFO],
        );
        assert_eq!(support.choose_format().unwrap().format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn falls_back_to_first_format() {
        let support = details(vec![format(vk::Format::R8G8B8A8_SRGB)], vec![vk::PresentModeKHR::FIFO]);
        assert_eq!(support.choose_format().unwrap().format, vk::Format::R8G8B8A8_SRGB);
        assert!(details(vec![], vec![]).choose_format().is_none());
        assert!(!details(vec![], vec![vk::PresentModeKHR::FIFO]).adequate());
    }

    #[test]
    fn mailbox_preferred_over_fifo() {
        let support = details(
            vec![],
            vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        );
        assert_eq!(support.choose_present_mode(), vk::PresentModeKHR::MAILBOX);
        let support = details(vec![], vec![vk::PresentModeKHR::IMMEDIATE]);
        assert_eq!(support.choose_present_mode(), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_clamped_to_capabilities() {
        let support = details(vec![], vec![]);
        let extent = support.choose_extent(4000, 0);
        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 1);
    }

    #[test]
    fn image_count_respects_maximum() {
        let mut support = details(vec![], vec![]);
        assert_eq!(support.choose_image_count(), 3);
        support.capabilities.max_image_count = 2;
        assert_eq!(support.choose_image_count(), 2);
    }
}
