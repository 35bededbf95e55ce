use std::path::Path;

use ash::vk;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

use crate::engine::gameloop::GameLoop;
use crate::engine::tutorial::{Tutorial, TutorialContext};
use crate::engine::window::Window;
use crate::error::Result;
use crate::util;
use crate::util::config::Config;
use crate::util::constants::{CONFIG_FILE, FRAMES_IN_FLIGHT};
use crate::vulkan;
use crate::vulkan::cmd_buffers::FrameCmdBuffers;
use crate::vulkan::debug;
use crate::vulkan::image;
use crate::vulkan::image::StorageImage;

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Entry point of every tutorial binary. Never returns; fatal errors exit with status 1.
pub fn run<T: Tutorial + 'static>() {
    let config = match Config::load(Path::new(CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = util::log::init_log(&config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let event_loop = EventLoop::new();
    match App::<T>::new(&event_loop, config) {
        Ok(app) => app.run(event_loop),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

// Field order is drop order: tutorial resources go before the device they were created on.
struct App<T: Tutorial> {
    tutorial: Option<T>,
    output_image: Option<StorageImage>,
    cmd_buffers: FrameCmdBuffers,
    gameloop: GameLoop,
    vulkan: vulkan::entry::Entry,
    window: Window,
    config: Config,
    is_paused: bool,
}

impl<T: Tutorial + 'static> App<T> {
    fn new(event_loop: &EventLoop<()>, config: Config) -> Result<Self> {
        log::info!("Starting {}", T::TITLE);

        let window = Window::new(event_loop, T::TITLE, config.window_width, config.window_height)?;
        let vulkan = vulkan::entry::Entry::new(
            window.get_os_window(),
            T::TITLE,
            T::required_features(),
            config.validation,
        )?;
        let cmd_buffers = FrameCmdBuffers::new(vulkan.get_device(), FRAMES_IN_FLIGHT)?;

        let mut gameloop = GameLoop::new();
        gameloop.set_max_fps(config.max_fps);

        let mut app = App {
            tutorial: None,
            output_image: None,
            cmd_buffers,
            gameloop,
            vulkan,
            window,
            config,
            is_paused: false,
        };
        app.create_frame_resources()?;

        Ok(app)
    }

    fn run(mut self, event_loop: EventLoop<()>) -> ! {
        event_loop.run(move |event, _, control_flow| {
            if !is_exiting(control_flow) {
                *control_flow = ControlFlow::Poll;
            }

            let result = match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        log::info!("Exit requested by window close request.");
                        *control_flow = ControlFlow::Exit;
                        self.wait_idle()
                    }
                    WindowEvent::Destroyed => {
                        log::info!("Exit on window destruction.");
                        *control_flow = ControlFlow::Exit;
                        self.wait_idle()
                    }
                    WindowEvent::Resized(_) => self.process_resize(),
                    _ => Ok(()),
                },
                Event::MainEventsCleared => {
                    self.update();
                    Ok(())
                }
                Event::Suspended => {
                    self.is_paused = true;
                    Ok(())
                }
                Event::Resumed => {
                    self.is_paused = false;
                    Ok(())
                }
                Event::RedrawRequested(_) => {
                    if self.is_paused || !self.gameloop.get_frame_started() {
                        return;
                    }
                    self.draw_frame()
                }
                Event::RedrawEventsCleared => {
                    self.gameloop.finish_frame();
                    self.window.show_fps(self.gameloop.get_fps());
                    if !is_exiting(control_flow) {
                        *control_flow = ControlFlow::WaitUntil(self.gameloop.get_wait_instant());
                    }
                    Ok(())
                }
                _ => Ok(()),
            };

            if let Err(e) = result {
                log::error!("{}", e);
                *control_flow = ControlFlow::ExitWithCode(1);
            }
        })
    }

    fn update(&mut self) {
        if !self.gameloop.should_start_frame() {
            return;
        }

        self.gameloop.start_frame();
        self.window.request_redraw();
    }

    fn draw_frame(&mut self) -> Result<()> {
        let swapchain = match self.vulkan.get_mut_swapchain() {
            Some(swapchain) => swapchain,
            None => return Ok(()),
        };
        let frame_idx = swapchain.current_frame;
        let image_idx = match swapchain.acquire_next_image()? {
            Some(image_idx) => image_idx,
            None => return self.recreate(),
        };

        let elapsed = self.gameloop.get_total_elapsed();
        if let Some(tutorial) = self.tutorial.as_mut() {
            tutorial.update_data_for_frame(frame_idx, elapsed)?;
        }

        let cmd_buffer = self.cmd_buffers.begin(frame_idx)?;
        self.record_frame(cmd_buffer, frame_idx, image_idx);
        self.cmd_buffers.end(frame_idx)?;

        let needs_recreate = match self.vulkan.get_mut_swapchain() {
            Some(swapchain) => {
                swapchain.submit(cmd_buffer)?;
                swapchain.present(image_idx)?
            }
            None => false,
        };
        if needs_recreate {
            self.recreate()?;
        }

        Ok(())
    }

    /// Clear the offscreen image, let the tutorial trace into it, then blit it to the swapchain image.
    fn record_frame(&self, cmd_buffer: vk::CommandBuffer, frame_idx: usize, image_idx: u32) {
        let device = self.vulkan.get_device();
        let (swapchain, output_image) = match (self.vulkan.get_swapchain(), self.output_image.as_ref()) {
            (Some(swapchain), Some(output_image)) => (swapchain, output_image),
            _ => return,
        };
        let swapchain_image = swapchain.images[image_idx as usize];

        let _frame_region = debug::Region::new(device, cmd_buffer, "Frame");

        image::cmd_transition(
            device,
            cmd_buffer,
            output_image.image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::GENERAL,
        );
        unsafe {
            device.logical_device.cmd_clear_color_image(
                cmd_buffer,
                output_image.image,
                vk::ImageLayout::GENERAL,
                &vk::ClearColorValue { float32: CLEAR_COLOR },
                &[image::color_subresource_range()],
            );
        }
        image::cmd_transition(
            device,
            cmd_buffer,
            output_image.image,
            vk::ImageLayout::GENERAL,
            vk::ImageLayout::GENERAL,
        );

        if let Some(tutorial) = self.tutorial.as_ref() {
            let _region = debug::Region::new(device, cmd_buffer, T::TITLE);
            tutorial.record_command_buffer_for_frame(cmd_buffer, frame_idx);
        }

        image::cmd_transition(
            device,
            cmd_buffer,
            output_image.image,
            vk::ImageLayout::GENERAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
        image::cmd_transition(
            device,
            cmd_buffer,
            swapchain_image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        image::cmd_blit(
            device,
            cmd_buffer,
            output_image.image,
            output_image.extent,
            swapchain_image,
            swapchain.extent,
        );
        image::cmd_transition(
            device,
            cmd_buffer,
            swapchain_image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        );
    }

    fn create_frame_resources(&mut self) -> Result<()> {
        let extent = match self.vulkan.get_swapchain() {
            Some(swapchain) => swapchain.extent,
            None => return Ok(()),
        };
        let output_image = StorageImage::new(self.vulkan.get_device(), extent, "Raytracing output")?;

        let ctx = TutorialContext {
            device: self.vulkan.get_device(),
            config: &self.config,
            output_image: &output_image,
            extent,
            frame_count: FRAMES_IN_FLIGHT,
        };
        let tutorial = T::init(&ctx)?;

        self.output_image = Some(output_image);
        self.tutorial = Some(tutorial);

        Ok(())
    }

    fn recreate(&mut self) -> Result<()> {
        if self.window.is_minimized() {
            self.is_paused = true;
            return Ok(());
        }
        self.is_paused = false;

        self.wait_idle()?;
        self.tutorial = None;
        self.output_image = None;

        let size = self.window.get_size();
        log::debug!("Recreating swapchain for {}x{}", size.x, size.y);
        self.vulkan.recreate_swapchain(size.x, size.y)?;
        self.create_frame_resources()
    }

    fn process_resize(&mut self) -> Result<()> {
        self.recreate()
    }

    fn wait_idle(&self) -> Result<()> {
        self.vulkan.get_device().wait_idle()
    }
}

fn is_exiting(control_flow: &ControlFlow) -> bool {
    matches!(*control_flow, ControlFlow::ExitWithCode(_))
}

impl<T: Tutorial> Drop for App<T> {
    fn drop(&mut self) {
        if let Err(e) = self.vulkan.get_device().wait_idle() {
            log::error!("{}", e);
        }
        log::info!("{} frames rendered", self.gameloop.get_frame_num());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_requests_are_kept() {
        assert!(is_exiting(&ControlFlow::Exit));
        assert!(is_exiting(&ControlFlow::ExitWithCode(1)));
        assert!(!is_exiting(&ControlFlow::Poll));
        assert!(!is_exiting(&ControlFlow::Wait));
    }
}
