pub mod cmd_buffers;
pub mod debug;
pub mod device;
pub mod entry;
pub mod extensions;
pub mod fence;
pub mod image;
pub mod instance;
pub mod mem;
pub mod rt;
pub mod semaphore;
pub mod shader;
pub mod swapchain;
