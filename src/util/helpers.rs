use std::ffi::CStr;
use std::os::raw::c_char;

pub fn required_validation_layer_names() -> [&'static CStr; 1] {
    // SAFETY: literal is nul-terminated with no interior nul.
    [unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") }]
}

/// Converts a fixed-size, nul-terminated name array from a Vulkan properties struct.
pub fn vulkan_str_to_str(c_string: &[c_char]) -> String {
    let bytes: Vec<u8> = c_string
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();

    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_c_array(name: &str) -> [c_char; 256] {
        let mut array = [0 as c_char; 256];
        for (dst, src) in array.iter_mut().zip(name.bytes()) {
            *dst = src as c_char;
        }
        array
    }

    #[test]
    fn converts_nul_terminated_name() {
        let name = to_c_array("VK_NV_ray_tracing");
        assert_eq!(vulkan_str_to_str(&name), "VK_NV_ray_tracing");
    }

    #[test]
    fn unterminated_name_uses_whole_array() {
        let name = [b'a' as c_char; 4];
        assert_eq!(vulkan_str_to_str(&name), "aaaa");
    }

    #[test]
    fn validation_layer_name() {
        assert_eq!(
            required_validation_layer_names()[0].to_str().unwrap(),
            "VK_LAYER_KHRONOS_validation"
        );
    }
}
