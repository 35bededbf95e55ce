pub mod config;
pub mod constants;
pub mod fs;
pub mod helpers;
pub mod log;
