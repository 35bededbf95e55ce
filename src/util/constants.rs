use ash::vk::make_api_version;

pub const APPLICATION_VERSION: u32 = make_api_version(0, 1, 0, 0);
pub const ENGINE_VERSION: u32 = make_api_version(0, 1, 0, 0);
pub const API_VERSION: u32 = make_api_version(0, 1, 2, 0);

pub const ENGINE_NAME: &'static str = "VkRay";
pub const WINDOW_WIDTH: u32 = 1280;
pub const WINDOW_HEIGHT: u32 = 720;
pub const MAX_FPS: i32 = 60;

/// Number of frames recorded ahead of the GPU; tutorials keep per-frame resources for each.
pub const FRAMES_IN_FLIGHT: usize = 3;

pub const SHADERS_DIR: &'static str = "shaders/bin";
pub const LOG_DIR: &'static str = "./log";
pub const CONFIG_FILE: &'static str = "vkray.json";
