use std::time::Instant;

/// Milliseconds of elapsed time per unit of progress.
pub const PROGRESS_TIME_SCALE: f32 = 50.0;
/// Progress saturates here; reached after five seconds.
pub const PROGRESS_MAX: f32 = 100.0;
/// Model-space drop per unit of progress.
pub const OFFSET_PER_PROGRESS: f32 = 0.01;

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether frames animate continuously or are
/// evaluated once at a fixed timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RenderPolicy {
    /// Redraw every display refresh using the wall clock.
    #[default]
    Animate,
    /// Render a single frame at the given elapsed time (milliseconds).
    Still { time_ms: f32 },
}

/// Snapshot of the animation clock for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in milliseconds.
    pub elapsed_ms: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(elapsed_ms: f32, frame_index: u64) -> Self {
        Self {
            elapsed_ms,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32() * 1000.0, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time_ms: f32,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(time_ms: f32) -> Self {
        Self { time_ms, frame: 0 }
    }
}

impl TimeSource for FixedTimeSource {
    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time_ms, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time_ms } => Box::new(FixedTimeSource::new(*time_ms)),
    }
}

/// Maps elapsed milliseconds onto `[0, PROGRESS_MAX]`.
pub fn progress(elapsed_ms: f32) -> f32 {
    if !elapsed_ms.is_finite() {
        return if elapsed_ms == f32::INFINITY {
            PROGRESS_MAX
        } else {
            0.0
        };
    }
    (elapsed_ms / PROGRESS_TIME_SCALE).clamp(0.0, PROGRESS_MAX)
}

/// Time-derived values computed once at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub elapsed_ms: f32,
    pub progress: f32,
}

impl FrameState {
    pub fn at(elapsed_ms: f32) -> Self {
        Self {
            elapsed_ms,
            progress: progress(elapsed_ms),
        }
    }

    pub fn from_sample(sample: TimeSample) -> Self {
        Self::at(sample.elapsed_ms)
    }

    /// Value of the `translateY` uniform and the photo's vertical drop.
    pub fn translate_y(&self) -> f32 {
        self.progress * OFFSET_PER_PROGRESS
    }

    pub fn is_settled(&self) -> bool {
        self.progress >= PROGRESS_MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_follows_elapsed_time() {
        assert_eq!(progress(0.0), 0.0);
        assert_eq!(progress(50.0), 1.0);
        assert_eq!(progress(2500.0), 50.0);
        assert_eq!(progress(5000.0), 100.0);
        assert_eq!(progress(10_000.0), 100.0);
    }

    #[test]
    fn progress_is_monotone() {
        let mut last = 0.0;
        for ms in (0..8000).step_by(13) {
            let value = progress(ms as f32);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn progress_handles_odd_inputs() {
        assert_eq!(progress(-10.0), 0.0);
        assert_eq!(progress(f32::NAN), 0.0);
        assert_eq!(progress(f32::INFINITY), PROGRESS_MAX);
    }

    #[test]
    fn frame_state_translate_y() {
        assert_eq!(FrameState::at(0.0).translate_y(), 0.0);
        assert!((FrameState::at(2500.0).translate_y() - 0.5).abs() < 1e-6);
        assert!((FrameState::at(7000.0).translate_y() - 1.0).abs() < 1e-6);
        assert!(FrameState::at(5000.0).is_settled());
        assert!(!FrameState::at(4999.0).is_settled());
    }

    #[test]
    fn fixed_source_repeats_time_and_counts_frames() {
        let mut source = FixedTimeSource::new(1200.0);
        assert_eq!(source.sample(), TimeSample::new(1200.0, 0));
        assert_eq!(source.sample(), TimeSample::new(1200.0, 1));
    }

    #[test]
    fn system_source_advances() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert!(second.elapsed_ms >= first.elapsed_ms);
        assert_eq!(second.frame_index, first.frame_index + 1);
    }

    #[test]
    fn policy_selects_source() {
        let mut still = time_source_for_policy(&RenderPolicy::Still { time_ms: 4200.0 });
        assert_eq!(still.sample().elapsed_ms, 4200.0);
        let mut live = time_source_for_policy(&RenderPolicy::Animate);
        assert!(live.sample().elapsed_ms < 1000.0);
    }
}
