use std::path::PathBuf;

use ash::prelude::VkResult;
use ash::vk;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{call} failed: {result}")]
    Vulkan {
        call: &'static str,
        result: vk::Result,
    },
    #[error("{0}")]
    MissingExtension(String),
    #[error("failed to load Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to read {}: {source}", path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not find suitable device")]
    NoSuitableDevice,
    #[error("failed to find memory type for filter {type_filter:#x} with {properties:?}")]
    NoMemoryType {
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    },
    #[error("logger setup failed: {0}")]
    Log(String),
}

/// Turns a raw Vulkan result into a crate error carrying the name of the failed call.
pub trait VkCheck<T> {
    fn check(self, call: &'static str) -> Result<T>;
}

impl<T> VkCheck<T> for VkResult<T> {
    fn check(self, call: &'static str) -> Result<T> {
        self.map_err(|result| Error::Vulkan { call, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_passes_value_through() {
        let ok: VkResult<u32> = Ok(7);
        assert_eq!(ok.check("vkTest").unwrap(), 7);
    }

    #[test]
    fn check_names_failed_call() {
        let failed: VkResult<()> = Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        match failed.check("vkAllocateMemory") {
            Err(Error::Vulkan { call, result }) => {
                assert_eq!(call, "vkAllocateMemory");
                assert_eq!(result, vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn vulkan_error_message_contains_call() {
        let err = Error::Vulkan {
            call: "vkCreateDevice",
            result: vk::Result::ERROR_INITIALIZATION_FAILED,
        };
        assert!(err.to_string().starts_with("vkCreateDevice failed"));
    }
}
