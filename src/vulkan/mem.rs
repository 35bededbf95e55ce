use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use super::debug;
use super::debug::DebugResource;
use super::device::Device;
use crate::error::{Result, VkCheck};

pub trait BufferData {
    fn size(&self) -> usize;
    fn as_ptr(&self) -> *const u8;
}

/// Buffer with its own memory allocation, both released on drop.
pub struct Buffer {
    device: Rc<Device>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    pub size: u64,
    label: String,
}

impl Buffer {
    pub fn new(
        device: &Rc<Device>,
        size: u64,
        usage: vk::BufferUsageFlags,
        mem_props: vk::MemoryPropertyFlags,
        label: &str,
    ) -> Result<Buffer> {
        let create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.logical_device.create_buffer(&create_info, None) }.check("vkCreateBuffer")?;
        let mem_requirements = unsafe { device.logical_device.get_buffer_memory_requirements(buffer) };

        let memory = match device.allocate_memory(&mem_requirements, mem_props) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.logical_device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        // From here on Drop releases both handles
        let ret = Buffer {
            device: Rc::clone(device),
            buffer,
            memory,
            size,
            label: String::from(label),
        };

        unsafe { device.logical_device.bind_buffer_memory(buffer, memory, 0) }.check("vkBindBufferMemory")?;
        debug::Object::label(device, &ret);

        Ok(ret)
    }

    /// Host visible buffer filled with `data`.
    pub fn new_host_visible_coherent(
        device: &Rc<Device>,
        data: &impl BufferData,
        usage: vk::BufferUsageFlags,
        label: &str,
    ) -> Result<Buffer> {
        let result = Self::new(
            device,
            data.size() as u64,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            label,
        )?;
        result.update_data(data, 0)?;

        Ok(result)
    }

    pub fn get_vk_buffer(&self) -> vk::Buffer {
        self.buffer
    }

    /// Copies `data` into the buffer memory at `offset`. Memory must be host visible and coherent.
    pub fn update_data(&self, data: &impl BufferData, offset: u64) -> Result<()> {
        if data.size() == 0 {
            return Ok(());
        }

        unsafe {
            let mapped_memory = self
                .device
                .logical_device
                .map_memory(self.memory, offset, data.size() as u64, vk::MemoryMapFlags::empty())
                .check("vkMapMemory")? as *mut u8;
            mapped_memory.copy_from_nonoverlapping(data.as_ptr(), data.size());
            self.device.logical_device.unmap_memory(self.memory);
        }

        Ok(())
    }
}

impl DebugResource for Buffer {
    fn get_type(&self) -> vk::ObjectType {
        vk::ObjectType::BUFFER
    }

    fn get_handle(&self) -> u64 {
        self.buffer.as_raw()
    }

    fn get_label(&self) -> &String {
        &self.label
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.logical_device.destroy_buffer(self.buffer, None);
            self.device.logical_device.free_memory(self.memory, None);
        }
    }
}

pub struct VecBufferData<'a, T> {
    data: &'a [T],
}

impl<'a, T> VecBufferData<'a, T> {
    pub fn new(data: &'a [T]) -> VecBufferData<'a, T> {
        VecBufferData { data }
    }
}

impl<'a, T> BufferData for VecBufferData<'a, T> {
    fn size(&self) -> usize {
        std::mem::size_of_val(self.data)
    }

    fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr() as *const u8
    }
}

pub struct StructBufferData<'a, T> {
    data: &'a T,
}

impl<'a, T> StructBufferData<'a, T> {
    pub fn new(data: &'a T) -> StructBufferData<'a, T> {
        StructBufferData { data }
    }
}

impl<'a, T> BufferData for StructBufferData<'a, T> {
    fn size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn as_ptr(&self) -> *const u8 {
        self.data as *const T as *const u8
    }
}

#[cfg(test)]
mod tests {
    use super::BufferData;
    use super::StructBufferData;
    use super::VecBufferData;

    #[test]
    fn empty_vec_buffer_data() {
        let empty_vec: Vec<u16> = vec![];
        let data = VecBufferData::new(&empty_vec);
        assert_eq!(data.size(), 0);
    }

    #[test]
    fn index_buffer_data() {
        let indices: Vec<u16> = vec![0, 1, 2];
        let data = VecBufferData::new(&indices);
        assert_eq!(data.size(), 6);
        assert_eq!(data.as_ptr(), indices.as_ptr() as *const u8);
    }

    #[test]
    fn vertex_buffer_data() {
        let vertices = [[-0.5f32, -0.5, 0.0], [0.0, 0.5, 0.0], [0.5, -0.5, 0.0]];
        let data = VecBufferData::new(&vertices);
        assert_eq!(data.size(), 3 * 12);
    }

    #[repr(C)]
    struct Color {
        r: f32,
        g: f32,
        b: f32,
    }

    #[test]
    fn struct_buffer_data() {
        let color = Color {
            r: 0.5,
            g: 0.0,
            b: 0.0,
        };
        let data = StructBufferData::new(&color);
        assert_eq!(data.size(), 12);
        assert_eq!(unsafe { *(data.as_ptr() as *const f32) }, color.r);
        assert_eq!(color.g + color.b, 0.0);
    }
}
