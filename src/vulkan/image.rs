use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use super::debug;
use super::debug::DebugResource;
use super::device::Device;
use crate::error::{Result, VkCheck};

pub const STORAGE_IMAGE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Offscreen image raytracing shaders write into. Lives in `GENERAL` layout while traced.
pub struct StorageImage {
    device: Rc<Device>,
    pub image: vk::Image,
    memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    label: String,
}

impl StorageImage {
    pub fn new(device: &Rc<Device>, extent: vk::Extent2D, label: &str) -> Result<StorageImage> {
        let format = STORAGE_IMAGE_FORMAT;
        let create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(
                vk::ImageUsageFlags::STORAGE
                    | vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST,
            )
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe { device.logical_device.create_image(&create_info, None) }.check("vkCreateImage")?;
        let mem_requirements = unsafe { device.logical_device.get_image_memory_requirements(image) };
        let memory = match device.allocate_memory(&mem_requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.logical_device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let mut ret = StorageImage {
            device: Rc::clone(device),
            image,
            memory,
            view: vk::ImageView::null(),
            extent,
            format,
            label: String::from(label),
        };

        unsafe { device.logical_device.bind_image_memory(image, memory, 0) }.check("vkBindImageMemory")?;

        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(color_subresource_range());
        ret.view = unsafe { device.logical_device.create_image_view(&view_create_info, None) }
            .check("vkCreateImageView")?;

        debug::Object::label(device, &ret);

        Ok(ret)
    }
}

impl DebugResource for StorageImage {
    fn get_type(&self) -> vk::ObjectType {
        vk::ObjectType::IMAGE
    }

    fn get_handle(&self) -> u64 {
        self.image.as_raw()
    }

    fn get_label(&self) -> &String {
        &self.label
    }
}

impl Drop for StorageImage {
    fn drop(&mut self) {
        unsafe {
            self.device.logical_device.destroy_image_view(self.view, None);
            self.device.logical_device.destroy_image(self.image, None);
            self.device.logical_device.free_memory(self.memory, None);
        }
    }
}

pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageAccess {
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
}

/// Stages and access masks for the layout transitions a frame goes through.
pub fn transition_access(old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Option<ImageAccess> {
    use vk::AccessFlags as A;
    use vk::ImageLayout as L;
    use vk::PipelineStageFlags as S;

    let access = match (old_layout, new_layout) {
        // Offscreen image before clear, after the previous frame's blit read it
        (L::UNDEFINED, L::GENERAL) => (S::TRANSFER, S::TRANSFER, A::empty(), A::TRANSFER_WRITE),
        // Clear done, raytracing writes
        (L::GENERAL, L::GENERAL) => (
            S::TRANSFER,
            S::RAY_TRACING_SHADER_NV,
            A::TRANSFER_WRITE,
            A::SHADER_READ | A::SHADER_WRITE,
        ),
        (L::GENERAL, L::TRANSFER_SRC_OPTIMAL) => (
            S::RAY_TRACING_SHADER_NV,
            S::TRANSFER,
            A::SHADER_WRITE,
            A::TRANSFER_READ,
        ),
        // Swapchain image; acquire semaphore is waited on at TRANSFER
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => (S::TRANSFER, S::TRANSFER, A::empty(), A::TRANSFER_WRITE),
        (L::TRANSFER_DST_OPTIMAL, L::PRESENT_SRC_KHR) => {
            (S::TRANSFER, S::BOTTOM_OF_PIPE, A::TRANSFER_WRITE, A::empty())
        }
        _ => return None,
    };

    Some(ImageAccess {
        src_stage: access.0,
        dst_stage: access.1,
        src_access: access.2,
        dst_access: access.3,
    })
}

pub fn cmd_transition(
    device: &Device,
    cmd_buffer: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let access = match transition_access(old_layout, new_layout) {
        Some(access) => access,
        None => {
            log::error!("Unsupported image layout transition {:?} -> {:?}", old_layout, new_layout);
            return;
        }
    };

    let barriers = [vk::ImageMemoryBarrier::builder()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .src_access_mask(access.src_access)
        .dst_access_mask(access.dst_access)
        .image(image)
        .subresource_range(color_subresource_range())
        .build()];

    unsafe {
        device.logical_device.cmd_pipeline_barrier(
            cmd_buffer,
            access.src_stage,
            access.dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &barriers,
        );
    }
}

/// Full-image blit between two images of possibly different size.
pub fn cmd_blit(
    device: &Device,
    cmd_buffer: vk::CommandBuffer,
    src: vk::Image,
    src_extent: vk::Extent2D,
    dst: vk::Image,
    dst_extent: vk::Extent2D,
) {
    let subresource = vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    };
    let regions = [vk::ImageBlit {
        src_subresource: subresource,
        src_offsets: [vk::Offset3D::default(), extent_offset(src_extent)],
        dst_subresource: subresource,
        dst_offsets: [vk::Offset3D::default(), extent_offset(dst_extent)],
    }];

    unsafe {
        device.logical_device.cmd_blit_image(
            cmd_buffer,
            src,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            dst,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &regions,
            vk::Filter::NEAREST,
        );
    }
}

fn extent_offset(extent: vk::Extent2D) -> vk::Offset3D {
    vk::Offset3D {
        x: extent.width as i32,
        y: extent.height as i32,
        z: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_transitions_are_known() {
        let frame = [
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::GENERAL),
            (vk::ImageLayout::GENERAL, vk::ImageLayout::GENERAL),
            (vk::ImageLayout::GENERAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::PRESENT_SRC_KHR),
        ];
        for (old, new) in frame {
            assert!(transition_access(old, new).is_some(), "{:?} -> {:?}", old, new);
        }
    }

    #[test]
    fn raytracing_waits_for_clear() {
        let access = transition_access(vk::ImageLayout::GENERAL, vk::ImageLayout::GENERAL).unwrap();
        assert_eq!(access.src_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(access.dst_stage, vk::PipelineStageFlags::RAY_TRACING_SHADER_NV);
        assert!(access.dst_access.contains(vk::AccessFlags::SHADER_WRITE));
    }

    #[test]
    fn clear_waits_for_previous_blit() {
        let access = transition_access(vk::ImageLayout::UNDEFINED, vk::ImageLayout::GENERAL).unwrap();
        assert!(access.src_stage.contains(vk::PipelineStageFlags::TRANSFER));
        assert_eq!(access.dst_access, vk::AccessFlags::TRANSFER_WRITE);
    }

    #[test]
    fn swapchain_transition_chains_with_acquire_wait() {
        let access = transition_access(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert!(access.src_stage.contains(vk::PipelineStageFlags::TRANSFER));
        assert_eq!(access.dst_stage, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn unknown_transition() {
        assert!(transition_access(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        )
        .is_none());
    }

    #[test]
    fn blit_offsets_cover_extent() {
        let offset = extent_offset(vk::Extent2D {
            width: 1280,
            height: 720,
        });
        assert_eq!((offset.x, offset.y, offset.z), (1280, 720, 1));
    }
}
