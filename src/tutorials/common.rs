use std::rc::Rc;

use ash::vk;

use crate::error::Result;
use crate::tutorials::scene::{Vertex, VERTEX_STRIDE};
use crate::vulkan::cmd_buffers::SingleTimeCmdBuffer;
use crate::vulkan::device::Device;
use crate::vulkan::mem::{Buffer, VecBufferData};
use crate::vulkan::rt::accel;
use crate::vulkan::rt::accel::{AccelerationStructure, ScratchRequirements};
use crate::vulkan::rt::instance::GeometryInstance;

/// One indexed mesh in a BLAS, instanced by a TLAS.
/// Field order keeps the geometry buffers alive until both structures are gone.
pub struct SceneAccel {
    pub tlas: AccelerationStructure,
    pub blas: AccelerationStructure,
    instance_buffer: Buffer,
    _index_buffer: Buffer,
    vertex_buffer: Buffer,
}

impl SceneAccel {
    /// `instances` gets the BLAS handle and returns the TLAS instance records.
    pub fn new(
        device: &Rc<Device>,
        vertices: &[Vertex],
        indices: &[u16],
        geometry_flags: vk::GeometryFlagsNV,
        build_flags: vk::BuildAccelerationStructureFlagsNV,
        instances: impl FnOnce(u64) -> Vec<GeometryInstance>,
        label: &str,
    ) -> Result<SceneAccel> {
        let host_visible = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        let vertex_buffer = Buffer::new(
            device,
            (vertices.len() as u64) * VERTEX_STRIDE,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::RAY_TRACING_NV,
            host_visible,
            &format!("{} vertices", label),
        )?;
        vertex_buffer.update_data(&VecBufferData::new(vertices), 0)?;

        let index_buffer = Buffer::new_host_visible_coherent(
            device,
            &VecBufferData::new(indices),
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::RAY_TRACING_NV,
            &format!("{} indices", label),
        )?;

        let geometry = accel::triangle_geometry(
            &vertex_buffer,
            vertices.len() as u32,
            VERTEX_STRIDE,
            &index_buffer,
            indices.len() as u32,
            geometry_flags,
        );
        let blas = AccelerationStructure::new_bottom(device, vec![geometry], build_flags, &format!("{} BLAS", label))?;

        let instances = instances(blas.handle);
        let instance_buffer = Buffer::new(
            device,
            std::mem::size_of_val(instances.as_slice()) as u64,
            vk::BufferUsageFlags::RAY_TRACING_NV,
            host_visible,
            &format!("{} instances", label),
        )?;
        instance_buffer.update_data(&VecBufferData::new(&instances), 0)?;

        let tlas = AccelerationStructure::new_top(
            device,
            instances.len() as u32,
            build_flags,
            &format!("{} TLAS", label),
        )?;

        Ok(SceneAccel {
            tlas,
            blas,
            instance_buffer,
            _index_buffer: index_buffer,
            vertex_buffer,
        })
    }

    pub fn scratch_requirements(&self) -> [ScratchRequirements; 2] {
        [self.blas.scratch_requirements(), self.tlas.scratch_requirements()]
    }

    /// BLAS then TLAS, each followed by a build barrier.
    pub fn cmd_build(&self, device: &Device, cmd_buffer: vk::CommandBuffer, update: bool, scratch: &Buffer) {
        self.blas.cmd_build(cmd_buffer, None, update, scratch);
        accel::cmd_build_barrier(device, cmd_buffer);
        self.tlas
            .cmd_build(cmd_buffer, Some(&self.instance_buffer), update, scratch);
        accel::cmd_build_barrier(device, cmd_buffer);
    }

    /// Vertex count must match the one the BLAS was created with.
    pub fn update_vertices(&self, vertices: &[Vertex]) -> Result<()> {
        self.vertex_buffer.update_data(&VecBufferData::new(vertices), 0)
    }

    pub fn update_instances(&self, instances: &[GeometryInstance]) -> Result<()> {
        self.instance_buffer.update_data(&VecBufferData::new(instances), 0)
    }
}

/// Device-local scratch large enough for every structure of every scene, refits included.
pub fn create_scratch_buffer(device: &Rc<Device>, scenes: &[&SceneAccel]) -> Result<Buffer> {
    let requirements: Vec<ScratchRequirements> = scenes
        .iter()
        .flat_map(|scene| scene.scratch_requirements())
        .collect();
    let size = accel::max_scratch_size(&requirements);
    log::debug!("Scratch buffer: {} bytes", size);

    Buffer::new(
        device,
        size,
        vk::BufferUsageFlags::RAY_TRACING_NV,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
        "Scratch",
    )
}

/// Builds every scene in one blocking submission. Returns the scratch buffer for later refits.
pub fn build_scenes(device: &Rc<Device>, scenes: &[&SceneAccel]) -> Result<Buffer> {
    let scratch = create_scratch_buffer(device, scenes)?;

    let cmd_buffer = SingleTimeCmdBuffer::begin(device)?;
    for scene in scenes {
        scene.cmd_build(device, cmd_buffer.get_cmd_buffer(), false, &scratch);
    }
    cmd_buffer.submit()?;

    Ok(scratch)
}
