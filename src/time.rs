//! Clock and timer facilities shared by every animated subsystem.
//!
//! [`Clock`] is the single source of elapsed time for a mounted effects
//! layer. The native host steps it from the wall clock ([`Clock::update`]);
//! embedders and tests step it by an explicit delta ([`Clock::advance`]).
//!
//! [`IntervalTimer`] is the fixed-period driver behind trail decay. It is
//! polled from the event loop and never depends on the frame rate.
//!
//! # Example
//!
//! ```ignore
//! use backdrop::time::Clock;
//!
//! let mut clock = Clock::new();
//!
//! // In the render loop:
//! clock.advance(1.0 / 60.0);
//!
//! println!("Elapsed: {:.2}s", clock.elapsed());
//! println!("Frame: {}", clock.frame());
//! ```

use std::time::{Duration, Instant};

/// Largest delta accepted for a single frame.
///
/// A window that was hidden or a debugger pause would otherwise make every
/// animation jump by the whole stall.
pub const MAX_FRAME_DELTA: f32 = 0.25;

/// Elapsed-time tracking for the render loop.
#[derive(Debug)]
pub struct Clock {
    /// Wall-clock instant of the last [`Clock::update`].
    last_frame: Instant,
    /// Sum of all scaled deltas, in seconds. Summed in `f64` so that
    /// small deltas still register after days of uptime.
    elapsed_secs: f64,
    /// Scaled delta of the most recent frame.
    delta_secs: f32,
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    fps_frame_count: u64,
    fps_window_secs: f32,
    paused: bool,
    /// Fixed delta time for deterministic updates (optional).
    fixed_delta: Option<f32>,
    /// Time scale multiplier (1.0 = normal speed).
    time_scale: f32,
}

impl Clock {
    /// Create a clock at zero elapsed time.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_window_secs: 0.0,
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
        }
    }

    /// Step the clock from the wall clock.
    ///
    /// Returns `(elapsed, delta)` after the step.
    pub fn update(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.advance(raw)
    }

    /// Step the clock by `raw_delta` seconds.
    ///
    /// Non-positive or non-finite deltas do not produce a frame: elapsed
    /// time is left untouched and `delta()` reads 0. This keeps elapsed
    /// time strictly increasing across frames.
    pub fn advance(&mut self, raw_delta: f32) -> (f32, f32) {
        if self.paused || !raw_delta.is_finite() || raw_delta <= 0.0 {
            self.delta_secs = 0.0;
            return (self.elapsed(), self.delta_secs);
        }

        let clamped = raw_delta.min(MAX_FRAME_DELTA);
        self.delta_secs = self.fixed_delta.unwrap_or(clamped) * self.time_scale;
        self.elapsed_secs += self.delta_secs as f64;
        self.frame_count += 1;

        // FPS is measured on real time, not scaled time.
        self.fps_window_secs += clamped;
        if self.fps_window_secs >= 0.5 {
            let frames = self.frame_count - self.fps_frame_count;
            self.fps = frames as f32 / self.fps_window_secs;
            self.fps_frame_count = self.frame_count;
            self.fps_window_secs = 0.0;
        }

        (self.elapsed(), self.delta_secs)
    }

    /// Total elapsed time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs as f32
    }

    /// Total elapsed time in seconds at full precision.
    #[inline]
    pub fn elapsed_f64(&self) -> f64 {
        self.elapsed_secs
    }

    /// Time since last frame in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Pause time progression.
    ///
    /// While paused, `delta()` returns 0 and `elapsed()` stops increasing.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume time progression after pausing.
    pub fn resume(&mut self) {
        if self.paused {
            // Drop the paused interval instead of replaying it.
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    /// Set a fixed delta time for deterministic updates.
    ///
    /// Pass `None` to use real frame timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta.filter(|d| d.is_finite() && *d > 0.0);
    }

    /// Set time scale multiplier.
    ///
    /// - `1.0` = normal speed
    /// - `0.5` = half speed (slow motion)
    /// - `2.0` = double speed
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-period timer polled from the event loop.
///
/// Each call to [`IntervalTimer::poll`] reports how many whole periods have
/// elapsed since the previous poll. Once cancelled, polling always yields 0.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: Duration,
    next: Option<Instant>,
    max_catch_up: u32,
}

impl IntervalTimer {
    /// Default cap on periods fired by a single poll.
    pub const DEFAULT_MAX_CATCH_UP: u32 = 40;

    /// Start a timer whose first period ends at `start + period`.
    ///
    /// A zero period is raised to one millisecond.
    pub fn start(period: Duration, start: Instant) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next: Some(start + period),
            max_catch_up: Self::DEFAULT_MAX_CATCH_UP,
        }
    }

    /// Limit how many periods one poll may report after a long stall.
    pub fn with_max_catch_up(mut self, max: u32) -> Self {
        self.max_catch_up = max.max(1);
        self
    }

    /// Number of periods that ended at or before `now`.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let Some(next) = self.next else {
            return 0;
        };
        if now < next {
            return 0;
        }

        let behind = now.duration_since(next).as_nanos() / self.period.as_nanos();
        let due = behind.saturating_add(1);
        if due > self.max_catch_up as u128 {
            // Too far behind to replay; resynchronise on `now`.
            self.next = Some(now + self.period);
            return self.max_catch_up;
        }

        let due = due as u32;
        self.next = Some(next + self.period * due);
        due
    }

    /// Stop the timer. Subsequent polls return 0.
    pub fn cancel(&mut self) {
        self.next = None;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.next.is_some()
    }

    /// Instant at which the next period ends, if the timer is running.
    #[inline]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }
}
