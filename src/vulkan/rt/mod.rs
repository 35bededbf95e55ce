pub mod accel;
pub mod descriptors;
pub mod instance;
pub mod pipeline;
pub mod raytracing;
pub mod sbt;
