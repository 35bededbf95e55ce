pub mod gameloop;
pub mod tutorial;
pub mod window;
