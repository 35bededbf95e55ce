pub mod accel;
pub mod animate;
pub mod common;
pub mod init;
pub mod instance_resources;
pub mod scene;
pub mod shaders;
