use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;
use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use super::debug;
use super::debug::DebugResource;
use super::device::Device;
use crate::error::{Error, Result, VkCheck};
use crate::util;

// SAFETY: literal is nul-terminated with no interior nul.
const ENTRY_POINT: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Raygen,
    Miss,
    ClosestHit,
    AnyHit,
}

impl ShaderStage {
    pub fn extension(&self) -> &'static str {
        match self {
            ShaderStage::Raygen => "rgen",
            ShaderStage::Miss => "rmiss",
            ShaderStage::ClosestHit => "rchit",
            ShaderStage::AnyHit => "rahit",
        }
    }

    pub fn flags(&self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Raygen => vk::ShaderStageFlags::RAYGEN_NV,
            ShaderStage::Miss => vk::ShaderStageFlags::MISS_NV,
            ShaderStage::ClosestHit => vk::ShaderStageFlags::CLOSEST_HIT_NV,
            ShaderStage::AnyHit => vk::ShaderStageFlags::ANY_HIT_NV,
        }
    }
}

/// `<name>.<stage>.spv`, the layout the shader build step writes.
pub fn shader_file_name(name: &str, stage: ShaderStage) -> String {
    let mut filename = String::from(name);
    filename.push('.');
    filename.push_str(stage.extension());
    filename.push_str(".spv");
    filename
}

pub struct ShaderModule {
    device: Rc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    label: String,
}

impl ShaderModule {
    pub fn load(device: &Rc<Device>, dir: &Path, name: &str, stage: ShaderStage) -> Result<ShaderModule> {
        let filename = shader_file_name(name, stage);
        let shader_path = dir.join(&filename);
        let code = read_spirv(&shader_path)?;

        let shader_module_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { device.logical_device.create_shader_module(&shader_module_info, None) }
            .check("vkCreateShaderModule")?;

        let ret = ShaderModule {
            device: Rc::clone(device),
            module,
            stage,
            label: filename,
        };
        debug::Object::label(device, &ret);
        log::debug!("Loaded shader {}", shader_path.display());

        Ok(ret)
    }

    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(self.stage.flags())
            .module(self.module)
            .name(ENTRY_POINT)
            .build()
    }
}

fn read_spirv(path: &Path) -> Result<Vec<u32>> {
    let bytes = util::fs::read_bin_file(path)?;
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|source| {
        log::error!("Invalid SPIR-V in {}", path.display());
        Error::File {
            path: path.to_path_buf(),
            source,
        }
    })
}

impl DebugResource for ShaderModule {
    fn get_type(&self) -> vk::ObjectType {
        vk::ObjectType::SHADER_MODULE
    }

    fn get_handle(&self) -> u64 {
        self.module.as_raw()
    }

    fn get_label(&self) -> &String {
        &self.label
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.logical_device.destroy_shader_module(self.module, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn file_names_per_stage() {
        assert_eq!(shader_file_name("rt_06_shaders", ShaderStage::Raygen), "rt_06_shaders.rgen.spv");
        assert_eq!(shader_file_name("rt_06_shaders", ShaderStage::Miss), "rt_06_shaders.rmiss.spv");
        assert_eq!(shader_file_name("rt_10_shaders", ShaderStage::ClosestHit), "rt_10_shaders.rchit.spv");
        assert_eq!(shader_file_name("rt_06_shaders", ShaderStage::AnyHit), "rt_06_shaders.rahit.spv");
    }

    #[test]
    fn stage_flags() {
        assert_eq!(ShaderStage::Raygen.flags(), vk::ShaderStageFlags::RAYGEN_NV);
        assert_eq!(ShaderStage::AnyHit.flags(), vk::ShaderStageFlags::ANY_HIT_NV);
    }

    #[test]
    fn reads_spirv_words() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // magic number followed by one word
        file.write_all(&[0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00]).unwrap();

        let words = read_spirv(file.path()).unwrap();
        assert_eq!(words, vec![0x0723_0203, 0x0001_0000]);
    }

    #[test]
    fn truncated_spirv_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x03, 0x02, 0x23]).unwrap();

        assert!(matches!(read_spirv(file.path()), Err(Error::File { .. })));
    }

    #[test]
    fn missing_shader_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(shader_file_name("rt_06_shaders", ShaderStage::Raygen));

        match read_spirv(&path) {
            Err(Error::File { path: err_path, .. }) => assert!(err_path.ends_with("rt_06_shaders.rgen.spv")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
