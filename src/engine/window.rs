use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

use crate::error::Result;

pub struct Window {
    os_window: winit::window::Window,
    title: String,
}

impl Window {
    pub fn new(event_loop: &EventLoop<()>, title: &str, width: u32, height: u32) -> Result<Self> {
        let os_window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .build(event_loop)?;

        Ok(Window {
            os_window,
            title: String::from(title),
        })
    }

    pub fn get_os_window(&self) -> &winit::window::Window {
        &self.os_window
    }

    pub fn show_fps(&self, fps: f32) {
        self.os_window.set_title(&title_with_fps(&self.title, fps));
    }

    pub fn request_redraw(&self) {
        self.os_window.request_redraw();
    }

    pub fn get_size(&self) -> cgmath::Vector2<u32> {
        let size = self.os_window.inner_size();
        cgmath::Vector2::new(size.width, size.height)
    }

    /// Minimized windows report a zero extent and cannot own a swapchain.
    pub fn is_minimized(&self) -> bool {
        let size = self.get_size();
        size.x == 0 || size.y == 0
    }
}

pub fn title_with_fps(title: &str, fps: f32) -> String {
    format!("{} | {:.2} FPS", title, fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_in_title() {
        assert_eq!(
            title_with_fps("VkRay Tutorial 06: Shaders", 59.994),
            "VkRay Tutorial 06: Shaders | 59.99 FPS"
        );
    }
}
