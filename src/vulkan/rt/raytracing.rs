use ash::extensions::nv::RayTracing;
use ash::vk;

/// `VK_NV_ray_tracing` entry points plus the limits the device reports for them.
pub struct Raytracing {
    pub loader: RayTracing,
    pub properties: vk::PhysicalDeviceRayTracingPropertiesNV,
}

impl Raytracing {
    pub fn new(instance: &ash::Instance, physical_device: vk::PhysicalDevice, logical_device: &ash::Device) -> Self {
        let mut properties = vk::PhysicalDeviceRayTracingPropertiesNV::default();

        {
            let mut physical_device_properties2 = vk::PhysicalDeviceProperties2::builder()
                .push_next(&mut properties)
                .build();

            unsafe {
                instance.get_physical_device_properties2(physical_device, &mut physical_device_properties2);
            }
        }

        let loader = RayTracing::new(instance, logical_device);

        Self { loader, properties }
    }

    pub fn handle_size(&self) -> u32 {
        self.properties.shader_group_handle_size
    }

    pub fn base_alignment(&self) -> u32 {
        self.properties.shader_group_base_alignment
    }

    pub fn log_properties(&self) {
        let props = &self.properties;
        log::info!("Raytracing properties:");
        log::info!("\tshaderGroupHandleSize: {}", props.shader_group_handle_size);
        log::info!("\tmaxRecursionDepth: {}", props.max_recursion_depth);
        log::info!("\tmaxShaderGroupStride: {}", props.max_shader_group_stride);
        log::info!("\tshaderGroupBaseAlignment: {}", props.shader_group_base_alignment);
        log::info!("\tmaxGeometryCount: {}", props.max_geometry_count);
        log::info!("\tmaxInstanceCount: {}", props.max_instance_count);
        log::info!("\tmaxTriangleCount: {}", props.max_triangle_count);
        log::info!(
            "\tmaxDescriptorSetAccelerationStructures: {}",
            props.max_descriptor_set_acceleration_structures
        );
    }
}
