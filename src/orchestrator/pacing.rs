use std::thread;
use std::time::{Duration, Instant};

/// Frame pacing and the FPS/frame-time counters shown in the window title.
///
/// Tracks a rolling one-second window: every frame increments a counter,
/// and once a full second has elapsed the window resets and hands back a
/// freshly formatted title string. Callers that don't care about pacing
/// (e.g. a headless test harness) can skip [`FramePacing::throttle`]
/// entirely and still get a title string once per second.
pub struct FramePacing {
    target_fps: u32,
    window_start: Instant,
    frames_in_window: u32,
}

impl FramePacing {
    /// Starts a new pacing window targeting `target_fps`.
    pub fn new(target_fps: u32) -> Self {
        FramePacing { target_fps: target_fps.max(1), window_start: Instant::now(), frames_in_window: 0 }
    }

    /// Sleeps off whatever's left of this frame's budget (`1/target_fps`
    /// seconds since `frame_start`), if the frame finished early.
    pub fn throttle(&self, frame_start: Instant) {
        let budget = Duration::from_secs_f64(1.0 / self.target_fps as f64);
        let elapsed = frame_start.elapsed();
        if elapsed < budget {
            thread::sleep(budget - elapsed);
        }
    }

    /// Records that a frame just completed. Once a full second has elapsed
    /// since the window opened, resets the window and returns a title
    /// string of the form `"<app_name> | FPS: <n> | Frame: <ms>ms"`;
    /// otherwise returns `None` and the caller should keep its current
    /// title.
    pub fn record_frame(&mut self, app_name: &str) -> Option<String> {
        self.frames_in_window += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed < Duration::from_secs(1) {
            return None;
        }

        let fps = self.frames_in_window;
        let avg_ms = elapsed.as_secs_f64() * 1000.0 / fps.max(1) as f64;
        self.frames_in_window = 0;
        self.window_start = Instant::now();
        Some(format!("{app_name} | FPS: {fps} | Frame: {avg_ms:.2}ms"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_title_before_a_second_elapses() {
        let mut pacing = FramePacing::new(120);
        assert!(pacing.record_frame("demo").is_none());
    }

    #[test]
    fn title_contains_app_name_once_a_second_has_passed() {
        let mut pacing = FramePacing::new(120);
        pacing.window_start = Instant::now() - Duration::from_millis(1100);
        let title = pacing.record_frame("demo").unwrap();
        assert!(title.starts_with("demo | FPS:"));
    }
}
