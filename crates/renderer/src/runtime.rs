use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether frames animate continuously or freeze
/// the shader at a single timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Run the render loop continuously, optionally clamping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Render at a fixed timestamp; a new frame is drawn only after a resize.
    Still {
        /// Timestamp the shader is evaluated at (seconds).
        time: f32,
    },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

/// Monotonic source of elapsed seconds feeding `uTime`.
pub trait Clock {
    /// Restarts the clock at zero.
    fn reset(&mut self);
    /// Seconds elapsed since construction or the last reset.
    fn elapsed(&self) -> f32;
}

/// Convenient alias for owning clocks behind trait objects.
pub type BoxedClock = Box<dyn Clock>;

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn elapsed(&self) -> f32 {
        (**self).elapsed()
    }
}

/// Clock backed by the system monotonic clock, started on construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn elapsed(&self) -> f32 {
        self.origin.elapsed().as_secs_f32()
    }
}

/// Clock that always reports the same timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: f32,
}

impl FixedClock {
    pub fn new(time: f32) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn reset(&mut self) {}

    fn elapsed(&self) -> f32 {
        self.time
    }
}

/// Clock advanced by hand. Clones share the same time cell, so a test or a
/// replay host can keep one handle while the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f32>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f32) {
        self.now.set(seconds);
    }

    pub fn advance(&self, seconds: f32) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn reset(&mut self) {
        self.now.set(0.0);
    }

    fn elapsed(&self) -> f32 {
        self.now.get()
    }
}

/// Builds a clock suited to the requested render policy.
pub fn clock_for_policy(policy: &RenderPolicy) -> BoxedClock {
    match policy {
        RenderPolicy::Animate { .. } => Box::new(SystemClock::new()),
        RenderPolicy::Still { time } => Box::new(FixedClock::new(*time)),
    }
}

/// Decides whether a display frame should actually be rendered.
///
/// Without a cap every display refresh renders. A cap whose frame interval
/// does not fit a `Duration` is treated as no cap. Still policies render one
/// frame and then wait for `reset` (issued on resize).
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    single_frame: bool,
    last_frame: Option<Instant>,
}

impl FramePacer {
    pub fn new(policy: &RenderPolicy) -> Self {
        match policy {
            RenderPolicy::Animate { target_fps } => Self {
                interval: target_fps
                    .filter(|fps| fps.is_finite() && *fps > 0.0)
                    .and_then(|fps| Duration::try_from_secs_f32(1.0 / fps).ok()),
                single_frame: false,
                last_frame: None,
            },
            RenderPolicy::Still { .. } => Self {
                interval: None,
                single_frame: true,
                last_frame: None,
            },
        }
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        let Some(last) = self.last_frame else {
            return true;
        };
        if self.single_frame {
            return false;
        }
        match self.interval {
            None => true,
            Some(interval) => now.saturating_duration_since(last) >= interval,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    /// Earliest instant the next frame may render, when one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.single_frame {
            return None;
        }
        match (self.last_frame, self.interval) {
            (Some(last), Some(interval)) => last.checked_add(interval),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.last_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.set(0.5);
        handle.advance(0.25);
        assert_eq!(clock.elapsed(), 0.75);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.elapsed();
        let second = clock.elapsed();
        assert!(second >= first);
    }

    #[test]
    fn still_policy_uses_fixed_clock() {
        let clock = clock_for_policy(&RenderPolicy::Still { time: 2.5 });
        assert_eq!(clock.elapsed(), 2.5);
    }

    #[test]
    fn uncapped_pacer_renders_every_frame() {
        let mut pacer = FramePacer::new(&RenderPolicy::default());
        let now = Instant::now();
        assert!(pacer.ready_for_frame(now));
        pacer.mark_rendered(now);
        assert!(pacer.ready_for_frame(now));
        assert_eq!(pacer.next_deadline(), None);
    }

    #[test]
    fn capped_pacer_waits_for_interval() {
        let mut pacer = FramePacer::new(&RenderPolicy::Animate {
            target_fps: Some(10.0),
        });
        let start = Instant::now();
        pacer.mark_rendered(start);
        assert!(!pacer.ready_for_frame(start + Duration::from_millis(50)));
        assert!(pacer.ready_for_frame(start + Duration::from_millis(120)));
        let deadline = pacer.next_deadline().expect("deadline");
        assert!(deadline > start);
    }

    #[test]
    fn non_positive_fps_means_uncapped() {
        let mut pacer = FramePacer::new(&RenderPolicy::Animate {
            target_fps: Some(0.0),
        });
        let now = Instant::now();
        pacer.mark_rendered(now);
        assert!(pacer.ready_for_frame(now));
    }

    #[test]
    fn still_pacer_renders_once_until_reset() {
        let mut pacer = FramePacer::new(&RenderPolicy::Still { time: 0.0 });
        let now = Instant::now();
        assert!(pacer.ready_for_frame(now));
        pacer.mark_rendered(now);
        assert!(!pacer.ready_for_frame(now + Duration::from_secs(5)));
        pacer.reset();
        assert!(pacer.ready_for_frame(now));
    }

    #[test]
    fn unrepresentable_interval_falls_back_to_uncapped() {
        let mut pacer = FramePacer::new(&RenderPolicy::Animate {
            target_fps: Some(1e-20),
        });
        let now = Instant::now();
        pacer.mark_rendered(now);
        assert!(pacer.ready_for_frame(now));
        assert_eq!(pacer.next_deadline(), None);
    }
}
