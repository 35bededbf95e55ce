use std::ops::Add;
use std::time;

use crate::util::constants::MAX_FPS;

pub struct GameLoop {
    // Application start time
    application_start_time: time::Instant,
    // Timestamp recorded when current frame has begun
    frame_start_time: time::Instant,
    // Time passed since previous frame was started
    prev_frame_duration: time::Duration,
    // Game loop waits before starting a new frame to keep FPS at or below this
    max_fps: i32,
    frame_started: bool,
    frame_num: u64,
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl GameLoop {
    pub fn new() -> Self {
        GameLoop {
            application_start_time: time::Instant::now(),
            frame_start_time: time::Instant::now(),
            prev_frame_duration: time::Duration::from_millis(0),
            max_fps: MAX_FPS,
            frame_started: false,
            frame_num: 0,
        }
    }

    fn wanted_time_per_frame(&self) -> time::Duration {
        time::Duration::from_micros(1_000_000 / self.max_fps.max(1) as u64)
    }

    // Get if it's time to start frame already
    pub fn should_start_frame(&self) -> bool {
        self.wanted_time_per_frame() <= self.frame_start_time.elapsed()
    }

    pub fn get_frame_started(&self) -> bool {
        self.frame_started
    }

    /// Update game loop state to notify next frame has started
    pub fn start_frame(&mut self) {
        self.prev_frame_duration = self.frame_start_time.elapsed();
        self.frame_start_time = time::Instant::now();
        self.frame_started = true;
    }

    // If frame was started - finish it and increase frame count
    pub fn finish_frame(&mut self) {
        if self.frame_started {
            self.frame_started = false;
            self.frame_num += 1;
        }
    }

    pub fn get_frame_num(&self) -> u64 {
        self.frame_num
    }

    // Get time Instant specifying the time we want to start next frame at
    pub fn get_wait_instant(&self) -> time::Instant {
        let wanted_time_per_frame = self.wanted_time_per_frame();
        let mut wait_until = time::Instant::now();
        let time_since_frame_start = self.frame_start_time.elapsed();
        if wanted_time_per_frame > time_since_frame_start {
            let time_to_wait = wanted_time_per_frame - time_since_frame_start;
            wait_until = wait_until.add(time_to_wait);
        }

        wait_until
    }

    pub fn get_total_elapsed(&self) -> time::Duration {
        time::Instant::now() - self.application_start_time
    }

    pub fn set_max_fps(&mut self, max_fps: i32) {
        self.max_fps = max_fps
    }

    /// Zero until a frame with measurable duration has passed.
    pub fn get_fps(&self) -> f32 {
        let secs = self.prev_frame_duration.as_secs_f32();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_counted_once() {
        let mut gameloop = GameLoop::new();
        assert!(!gameloop.get_frame_started());

        gameloop.start_frame();
        assert!(gameloop.get_frame_started());
        gameloop.finish_frame();
        gameloop.finish_frame();

        assert!(!gameloop.get_frame_started());
        assert_eq!(gameloop.get_frame_num(), 1);
    }

    #[test]
    fn finish_without_start_is_noop() {
        let mut gameloop = GameLoop::new();
        gameloop.finish_frame();
        assert_eq!(gameloop.get_frame_num(), 0);
    }

    #[test]
    fn fps_before_first_frame_is_zero() {
        let gameloop = GameLoop::new();
        assert_eq!(gameloop.get_fps(), 0.0);
    }

    #[test]
    fn fps_from_frame_duration() {
        let mut gameloop = GameLoop::new();
        gameloop.prev_frame_duration = time::Duration::from_millis(20);
        assert!((gameloop.get_fps() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn frame_pacing() {
        let mut gameloop = GameLoop::new();
        gameloop.set_max_fps(1);
        gameloop.start_frame();
        assert!(!gameloop.should_start_frame());
        assert!(gameloop.get_wait_instant() > time::Instant::now());

        gameloop.set_max_fps(0);
        // Treated as one frame per second rather than dividing by zero
        assert!(!gameloop.should_start_frame());
    }
}
