//! Clocks and the frame driver
//!
//! The driver is the only place that turns wall-clock time into simulation
//! ticks. In full-motion mode the host calls [`FrameDriver::frame`] once per
//! display refresh and the driver runs as many fixed 1/60 s ticks as the
//! elapsed time covers. In reduced-motion mode it fires on a coarse interval
//! and advances exactly one tick per firing, drawn at a synthetic timestamp.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::color::Theme;
use crate::render::{render, Frame};
use crate::scene::{Motion, Scene};
use crate::simulation::{tick, TICK_MS};

/// Upper bound on ticks run for a single frame
pub const MAX_TICKS_PER_FRAME: u32 = 8;

/// Firing interval under reduced motion, in milliseconds
pub const REDUCED_INTERVAL_MS: f64 = 1000.0;

/// Source of the current time in epoch milliseconds
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep a handle while the
/// machine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self { now: Rc::new(Cell::new(start_ms)) }
    }

    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

/// How frames are paced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverMode {
    /// One frame per display refresh, ticks derived from elapsed time
    EveryFrame,
    /// One tick per firing of a fixed interval
    Coarse { interval_ms: f64 },
}

impl DriverMode {
    pub fn for_motion(motion: Motion) -> Self {
        if motion.is_reduced() {
            DriverMode::Coarse { interval_ms: REDUCED_INTERVAL_MS }
        } else {
            DriverMode::EveryFrame
        }
    }
}

/// Paces simulation ticks and renders frames
#[derive(Debug, Clone)]
pub struct FrameDriver {
    mode: DriverMode,
    running: bool,
    last_ms: Option<f64>,
    accumulator: f64,
    next_due: Option<f64>,
    synthetic_ms: f64,
    last_ticks: u32,
}

impl FrameDriver {
    pub fn new(mode: DriverMode) -> Self {
        Self {
            mode,
            running: true,
            last_ms: None,
            accumulator: 0.0,
            next_due: None,
            synthetic_ms: 0.0,
            last_ticks: 0,
        }
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks run by the most recent call to [`FrameDriver::frame`]
    pub fn last_ticks(&self) -> u32 {
        self.last_ticks
    }

    /// Pause while hidden; on becoming visible, forget the elapsed gap.
    pub fn set_visible(&mut self, visible: bool) {
        if visible && !self.running {
            self.last_ms = None;
            self.accumulator = 0.0;
            self.next_due = None;
        }
        self.running = visible;
        debug!(visible, "frame driver visibility changed");
    }

    /// Advance the scene for the time elapsed up to `now_ms` and render it.
    ///
    /// Returns `None` while paused, or in coarse mode when the interval has
    /// not yet elapsed.
    pub fn frame(&mut self, scene: &mut Scene, theme: &Theme, now_ms: f64) -> Option<Frame> {
        self.last_ticks = 0;
        if !self.running {
            return None;
        }

        match self.mode {
            DriverMode::EveryFrame => {
                let ticks = match self.last_ms {
                    // First frame after start or resume
                    None => 1,
                    Some(last) => {
                        self.accumulator += (now_ms - last).max(0.0);
                        let due = (self.accumulator / TICK_MS).floor() as u32;
                        if due > MAX_TICKS_PER_FRAME {
                            debug!(due, "dropping ticks beyond the per-frame cap");
                            self.accumulator = 0.0;
                            MAX_TICKS_PER_FRAME
                        } else {
                            self.accumulator -= due as f64 * TICK_MS;
                            due
                        }
                    }
                };
                self.last_ms = Some(now_ms);
                self.advance(scene, ticks);
                Some(render(scene, theme, now_ms))
            }
            DriverMode::Coarse { interval_ms } => {
                if let Some(due) = self.next_due {
                    if now_ms < due {
                        return None;
                    }
                }
                self.next_due = Some(now_ms + interval_ms);
                self.synthetic_ms += interval_ms;
                self.advance(scene, 1);
                Some(render(scene, theme, self.synthetic_ms))
            }
        }
    }

    fn advance(&mut self, scene: &mut Scene, ticks: u32) {
        for _ in 0..ticks {
            tick(scene);
        }
        self.last_ticks = ticks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::scene::Viewport;

    fn scene() -> Scene {
        Scene::new(Record::default(), Viewport::new(200.0, 100.0, 1.0), Motion::Full, Some(5))
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance(250);
        assert_eq!(clock.now_ms(), 1_250);
        handle.set(7);
        assert_eq!(clock.now_ms(), 7);
    }

    #[test]
    fn test_every_frame_converts_elapsed_time() {
        let mut driver = FrameDriver::new(DriverMode::EveryFrame);
        let mut s = scene();
        let theme = Theme::default();

        assert!(driver.frame(&mut s, &theme, 0.0).is_some());
        assert_eq!(driver.last_ticks(), 1);

        driver.frame(&mut s, &theme, 51.0);
        assert_eq!(driver.last_ticks(), 3);

        // 120 Hz display: one tick every other frame
        driver.frame(&mut s, &theme, 58.0);
        assert_eq!(driver.last_ticks(), 0);
        driver.frame(&mut s, &theme, 67.0);
        assert_eq!(driver.last_ticks(), 1);
    }

    #[test]
    fn test_long_gap_is_capped() {
        let mut driver = FrameDriver::new(DriverMode::EveryFrame);
        let mut s = scene();
        let theme = Theme::default();
        driver.frame(&mut s, &theme, 0.0);
        driver.frame(&mut s, &theme, 5_000.0);
        assert_eq!(driver.last_ticks(), MAX_TICKS_PER_FRAME);
        // The remainder was dropped, not carried
        driver.frame(&mut s, &theme, 5_010.0);
        assert_eq!(driver.last_ticks(), 0);
    }

    #[test]
    fn test_hidden_produces_no_frames_and_resumes_without_burst() {
        let mut driver = FrameDriver::new(DriverMode::EveryFrame);
        let mut s = scene();
        let theme = Theme::default();
        driver.frame(&mut s, &theme, 0.0);

        driver.set_visible(false);
        assert!(!driver.is_running());
        assert!(driver.frame(&mut s, &theme, 16.0).is_none());
        assert_eq!(driver.last_ticks(), 0);

        driver.set_visible(true);
        assert!(driver.frame(&mut s, &theme, 60_000.0).is_some());
        assert_eq!(driver.last_ticks(), 1);
    }

    #[test]
    fn test_frame_timestamp_is_real_time() {
        let mut driver = FrameDriver::new(DriverMode::EveryFrame);
        let mut s = scene();
        let frame = driver.frame(&mut s, &Theme::default(), 1234.5).unwrap();
        assert_eq!(frame.timestamp, 1234.5);
    }

    #[test]
    fn test_coarse_mode_one_tick_per_interval() {
        let mut driver = FrameDriver::new(DriverMode::for_motion(Motion::Reduced));
        let mut s = scene();
        let theme = Theme::default();

        let first = driver.frame(&mut s, &theme, 10.0).unwrap();
        assert_eq!(first.timestamp, 1000.0);
        assert_eq!(driver.last_ticks(), 1);

        assert!(driver.frame(&mut s, &theme, 500.0).is_none());

        // Several missed intervals still fire once
        let second = driver.frame(&mut s, &theme, 4_000.0).unwrap();
        assert_eq!(second.timestamp, 2000.0);
        assert_eq!(driver.last_ticks(), 1);
    }

    #[test]
    fn test_mode_follows_motion() {
        assert_eq!(DriverMode::for_motion(Motion::Full), DriverMode::EveryFrame);
        assert_eq!(
            DriverMode::for_motion(Motion::Reduced),
            DriverMode::Coarse { interval_ms: 1000.0 }
        );
    }
}
