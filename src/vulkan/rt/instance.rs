use ash::vk;
use cgmath::Matrix4;

const MASK_24: u32 = 0x00ff_ffff;

/// 64-byte instance record a top level build reads from the instance buffer.
pub type GeometryInstance = vk::AccelerationStructureInstanceKHR;

/// Custom index and SBT offset keep their low 24 bits.
pub fn geometry_instance(
    transform: [f32; 12],
    custom_index: u32,
    mask: u8,
    sbt_offset: u32,
    flags: vk::GeometryInstanceFlagsKHR,
    blas_handle: u64,
) -> GeometryInstance {
    vk::AccelerationStructureInstanceKHR {
        transform: vk::TransformMatrixKHR { matrix: transform },
        instance_custom_index_and_mask: vk::Packed24_8::new(custom_index & MASK_24, mask),
        instance_shader_binding_table_record_offset_and_flags: vk::Packed24_8::new(
            sbt_offset & MASK_24,
            flags.as_raw() as u8,
        ),
        acceleration_structure_reference: vk::AccelerationStructureReferenceKHR {
            device_handle: blas_handle,
        },
    }
}

/// Top three rows of the matrix, row-major.
pub fn transform_rows(m: Matrix4<f32>) -> [f32; 12] {
    [
        m.x.x, m.y.x, m.z.x, m.w.x, //
        m.x.y, m.y.y, m.z.y, m.w.y, //
        m.x.z, m.y.z, m.z.z, m.w.z,
    ]
}

#[cfg(test)]
mod tests {
    use cgmath::{Rad, SquareMatrix, Vector3};

    use super::*;

    #[test]
    fn record_is_64_bytes() {
        assert_eq!(std::mem::size_of::<GeometryInstance>(), 64);
    }

    #[test]
    fn fields_are_packed() {
        let instance = geometry_instance(
            transform_rows(Matrix4::identity()),
            2,
            0xff,
            1,
            vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE,
            0xdead_beef_0000_0001,
        );

        assert_eq!(instance.instance_custom_index_and_mask.low_24(), 2);
        assert_eq!(instance.instance_custom_index_and_mask.high_8(), 0xff);
        assert_eq!(instance.instance_shader_binding_table_record_offset_and_flags.low_24(), 1);
        assert_eq!(
            instance.instance_shader_binding_table_record_offset_and_flags.high_8() as u32,
            vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE.as_raw()
        );
        assert_eq!(unsafe { instance.acceleration_structure_reference.device_handle }, 0xdead_beef_0000_0001);
    }

    #[test]
    fn oversized_index_is_masked() {
        let instance = geometry_instance(
            [0.0; 12],
            0x0100_0003,
            0x0f,
            0xffff_ffff,
            vk::GeometryInstanceFlagsKHR::empty(),
            0,
        );

        assert_eq!(instance.instance_custom_index_and_mask.low_24(), 3);
        assert_eq!(instance.instance_custom_index_and_mask.high_8(), 0x0f);
        assert_eq!(instance.instance_shader_binding_table_record_offset_and_flags.low_24(), MASK_24);
    }

    #[test]
    fn translation_lands_in_last_column() {
        let rows = transform_rows(Matrix4::from_translation(Vector3::new(-1.5, -0.5, 0.0)));
        assert_eq!(rows, [1.0, 0.0, 0.0, -1.5, 0.0, 1.0, 0.0, -0.5, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn z_rotation_rows() {
        let t = 0.7f32;
        let rows = transform_rows(Matrix4::from_angle_z(Rad(t)));
        let expected = [t.cos(), -t.sin(), 0.0, 0.0, t.sin(), t.cos(), 0.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        for (a, b) in rows.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
