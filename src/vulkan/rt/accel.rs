use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use crate::error::{Result, VkCheck};
use crate::vulkan::debug;
use crate::vulkan::debug::DebugResource;
use crate::vulkan::device::Device;
use crate::vulkan::mem::Buffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchKind {
    Build,
    Update,
}

/// Scratch memory one structure needs. `update` is only known for refittable structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScratchRequirements {
    pub build: u64,
    pub update: Option<u64>,
}

/// NV acceleration structure with its own device-local memory, bound at creation.
pub struct AccelerationStructure {
    device: Rc<Device>,
    pub accel: vk::AccelerationStructureNV,
    memory: vk::DeviceMemory,
    /// Opaque handle instances use to reference a bottom level structure.
    pub handle: u64,
    ty: vk::AccelerationStructureTypeNV,
    flags: vk::BuildAccelerationStructureFlagsNV,
    geometries: Vec<vk::GeometryNV>,
    instance_count: u32,
    label: String,
}

impl AccelerationStructure {
    /// Geometry buffers must outlive the structure.
    pub fn new_bottom(
        device: &Rc<Device>,
        geometries: Vec<vk::GeometryNV>,
        flags: vk::BuildAccelerationStructureFlagsNV,
        label: &str,
    ) -> Result<AccelerationStructure> {
        Self::new(
            device,
            vk::AccelerationStructureTypeNV::BOTTOM_LEVEL,
            flags,
            geometries,
            0,
            label,
        )
    }

    pub fn new_top(
        device: &Rc<Device>,
        instance_count: u32,
        flags: vk::BuildAccelerationStructureFlagsNV,
        label: &str,
    ) -> Result<AccelerationStructure> {
        Self::new(
            device,
            vk::AccelerationStructureTypeNV::TOP_LEVEL,
            flags,
            vec![],
            instance_count,
            label,
        )
    }

    fn new(
        device: &Rc<Device>,
        ty: vk::AccelerationStructureTypeNV,
        flags: vk::BuildAccelerationStructureFlagsNV,
        geometries: Vec<vk::GeometryNV>,
        instance_count: u32,
        label: &str,
    ) -> Result<AccelerationStructure> {
        let rt = &device.raytracing.loader;

        let mut ret = AccelerationStructure {
            device: Rc::clone(device),
            accel: vk::AccelerationStructureNV::null(),
            memory: vk::DeviceMemory::null(),
            handle: 0,
            ty,
            flags,
            geometries,
            instance_count,
            label: String::from(label),
        };

        let create_info = vk::AccelerationStructureCreateInfoNV::builder().info(ret.info());
        ret.accel = unsafe { rt.create_acceleration_structure(&create_info, None) }
            .check("vkCreateAccelerationStructureNV")?;

        let requirements = ret.memory_requirements(vk::AccelerationStructureMemoryRequirementsTypeNV::OBJECT);
        ret.memory = device.allocate_memory(&requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;

        let bind_info = [vk::BindAccelerationStructureMemoryInfoNV::builder()
            .acceleration_structure(ret.accel)
            .memory(ret.memory)
            .memory_offset(0)
            .build()];
        unsafe { rt.bind_acceleration_structure_memory(&bind_info) }
            .check("vkBindAccelerationStructureMemoryNV")?;

        ret.handle = unsafe { rt.get_acceleration_structure_handle(ret.accel) }
            .check("vkGetAccelerationStructureHandleNV")?;

        debug::Object::label(device, &ret);
        log::debug!(
            "Created {:?} acceleration structure {} ({} bytes)",
            ty,
            label,
            requirements.size
        );

        Ok(ret)
    }

    /// Build info the structure was created with. Borrows the geometry list.
    pub fn info(&self) -> vk::AccelerationStructureInfoNV {
        vk::AccelerationStructureInfoNV::builder()
            .ty(self.ty)
            .flags(self.flags)
            .instance_count(self.instance_count)
            .geometries(&self.geometries)
            .build()
    }

    pub fn allows_update(&self) -> bool {
        self.flags.contains(vk::BuildAccelerationStructureFlagsNV::ALLOW_UPDATE)
    }

    pub fn scratch_size(&self, kind: ScratchKind) -> u64 {
        let ty = match kind {
            ScratchKind::Build => vk::AccelerationStructureMemoryRequirementsTypeNV::BUILD_SCRATCH,
            ScratchKind::Update => vk::AccelerationStructureMemoryRequirementsTypeNV::UPDATE_SCRATCH,
        };

        self.memory_requirements(ty).size
    }

    pub fn scratch_requirements(&self) -> ScratchRequirements {
        ScratchRequirements {
            build: self.scratch_size(ScratchKind::Build),
            update: if self.allows_update() {
                Some(self.scratch_size(ScratchKind::Update))
            } else {
                None
            },
        }
    }

    fn memory_requirements(&self, ty: vk::AccelerationStructureMemoryRequirementsTypeNV) -> vk::MemoryRequirements {
        let info = vk::AccelerationStructureMemoryRequirementsInfoNV::builder()
            .ty(ty)
            .acceleration_structure(self.accel);

        unsafe {
            self.device
                .raytracing
                .loader
                .get_acceleration_structure_memory_requirements(&info)
        }
        .memory_requirements
    }

    /// Records a build. With `update` the structure is refitted in place, which requires `ALLOW_UPDATE`.
    pub fn cmd_build(
        &self,
        cmd_buffer: vk::CommandBuffer,
        instance_buffer: Option<&Buffer>,
        update: bool,
        scratch: &Buffer,
    ) {
        let update = if update && !self.allows_update() {
            log::warn!("{} was not created with ALLOW_UPDATE, rebuilding instead of refit", self.label);
            false
        } else {
            update
        };
        let src = if update {
            self.accel
        } else {
            vk::AccelerationStructureNV::null()
        };
        let instance_data = instance_buffer.map_or(vk::Buffer::null(), |buffer| buffer.get_vk_buffer());
        let info = self.info();

        unsafe {
            self.device.raytracing.loader.cmd_build_acceleration_structure(
                cmd_buffer,
                &info,
                instance_data,
                0,
                update,
                self.accel,
                src,
                scratch.get_vk_buffer(),
                0,
            );
        }
    }
}

impl DebugResource for AccelerationStructure {
    fn get_type(&self) -> vk::ObjectType {
        vk::ObjectType::ACCELERATION_STRUCTURE_NV
    }

    fn get_handle(&self) -> u64 {
        self.accel.as_raw()
    }

    fn get_label(&self) -> &String {
        &self.label
    }
}

impl Drop for AccelerationStructure {
    fn drop(&mut self) {
        unsafe {
            self.device
                .raytracing
                .loader
                .destroy_acceleration_structure(self.accel, None);
            self.device.logical_device.free_memory(self.memory, None);
        }
    }
}

/// Largest scratch size over every structure, update scratch included where refits happen.
pub fn max_scratch_size(requirements: &[ScratchRequirements]) -> u64 {
    requirements
        .iter()
        .map(|req| req.build.max(req.update.unwrap_or(0)))
        .max()
        .unwrap_or(0)
}

/// Orders consecutive acceleration structure builds, and tracing after them.
pub fn cmd_build_barrier(device: &Device, cmd_buffer: vk::CommandBuffer) {
    let access = vk::AccessFlags::ACCELERATION_STRUCTURE_READ_NV | vk::AccessFlags::ACCELERATION_STRUCTURE_WRITE_NV;
    let memory_barrier = [vk::MemoryBarrier::builder()
        .src_access_mask(access)
        .dst_access_mask(access)
        .build()];

    unsafe {
        device.logical_device.cmd_pipeline_barrier(
            cmd_buffer,
            vk::PipelineStageFlags::ACCELERATION_STRUCTURE_BUILD_NV,
            vk::PipelineStageFlags::ACCELERATION_STRUCTURE_BUILD_NV | vk::PipelineStageFlags::RAY_TRACING_SHADER_NV,
            vk::DependencyFlags::empty(),
            &memory_barrier,
            &[],
            &[],
        );
    }
}

/// Indexed triangle geometry over R32G32B32 float vertices and u16 indices.
/// Any-hit shaders only run on geometry without `OPAQUE`.
pub fn triangle_geometry(
    vertex_buffer: &Buffer,
    vertex_count: u32,
    vertex_stride: u64,
    index_buffer: &Buffer,
    index_count: u32,
    flags: vk::GeometryFlagsNV,
) -> vk::GeometryNV {
    let triangles = vk::GeometryTrianglesNV::builder()
        .vertex_data(vertex_buffer.get_vk_buffer())
        .vertex_offset(0)
        .vertex_count(vertex_count)
        .vertex_stride(vertex_stride)
        .vertex_format(vk::Format::R32G32B32_SFLOAT)
        .index_data(index_buffer.get_vk_buffer())
        .index_offset(0)
        .index_count(index_count)
        .index_type(vk::IndexType::UINT16)
        .transform_data(vk::Buffer::null())
        .transform_offset(0)
        .build();

    vk::GeometryNV::builder()
        .geometry_type(vk::GeometryTypeNV::TRIANGLES)
        .geometry(vk::GeometryDataNV::builder().triangles(triangles).build())
        .flags(flags)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_is_max_of_build_sizes() {
        let requirements = [
            ScratchRequirements {
                build: 4096,
                update: None,
            },
            ScratchRequirements {
                build: 1024,
                update: None,
            },
        ];
        assert_eq!(max_scratch_size(&requirements), 4096);
    }

    #[test]
    fn update_scratch_counts_for_refit() {
        let requirements = [
            ScratchRequirements {
                build: 4096,
                update: Some(512),
            },
            ScratchRequirements {
                build: 1024,
                update: Some(8192),
            },
        ];
        assert_eq!(max_scratch_size(&requirements), 8192);
    }

    #[test]
    fn no_structures_no_scratch() {
        assert_eq!(max_scratch_size(&[]), 0);
    }
}
