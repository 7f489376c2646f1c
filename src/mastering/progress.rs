//! Progress reporting
//!
//! The pipeline reports coarse percentages at fixed milestones. Callers
//! inject any [`ProgressSink`]; closures work directly.

/// Pipeline start
pub const START: u8 = 5;
/// Input decoded
pub const DECODED: u8 = 30;
/// First render pass complete
pub const FIRST_PASS_DONE: u8 = 60;
/// Loudness analysis complete
pub const ANALYZED: u8 = 65;
/// Correction pass complete (or skipped)
pub const CORRECTED: u8 = 75;
/// Preview trimmed
pub const TRIMMED: u8 = 85;
/// Both outputs encoded
pub const ENCODED: u8 = 95;
/// Finished
pub const DONE: u8 = 100;

/// Receives progress percentages in the range 0..=100
pub trait ProgressSink {
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Sink that discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Wraps a sink so it only ever sees non-decreasing values capped at 100
pub struct ProgressTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    last: u8,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self { sink, last: 0 }
    }

    /// Continue tracking where an earlier tracker on the same sink stopped
    pub fn resume(sink: &'a mut dyn ProgressSink, last: u8) -> Self {
        Self { sink, last }
    }

    /// Last value forwarded to the sink
    pub fn last(&self) -> u8 {
        self.last
    }

    /// Forward a milestone; values below the last report are raised to it
    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(DONE).max(self.last);
        self.last = percent;
        self.sink.report(percent);
    }

    /// Report `done` out of `total` steps mapped onto `start..=end`
    pub fn report_step(&mut self, start: u8, end: u8, done: usize, total: usize) {
        if total == 0 {
            self.report(end);
            return;
        }
        let span = end.saturating_sub(start) as usize;
        let offset = span * done.min(total) / total;
        self.report(start.saturating_add(offset as u8));
    }
}
