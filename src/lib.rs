pub mod app;
pub mod engine;
pub mod error;
pub mod tutorials;
pub mod util;
pub mod vulkan;

pub use error::{Error, Result};
