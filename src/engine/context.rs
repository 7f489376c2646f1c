//! Render context
//!
//! Caller-owned description of the audio being rendered. There is no
//! process-wide audio context; each render pass receives one of these.

use serde::{Deserialize, Serialize};

use crate::engine::buffer::SampleBuffer;
use crate::error::{MasterError, Result};

/// Sample rate and channel count a render pass operates at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderContext {
    pub sample_rate: u32,
    pub channels: usize,
}

impl RenderContext {
    /// Create a context for the given format
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Context matching an existing buffer
    pub fn for_buffer(buffer: &SampleBuffer) -> Self {
        Self::new(buffer.sample_rate(), buffer.num_channels())
    }

    /// One-pole smoothing coefficient for a time constant in seconds
    ///
    /// A non-positive time constant yields 0.0 (instant response).
    pub fn time_coefficient(&self, seconds: f32) -> f32 {
        let samples = seconds as f64 * self.sample_rate as f64;
        if samples > 0.0 {
            (-1.0 / samples).exp() as f32
        } else {
            0.0
        }
    }

    /// Verify a buffer has the format this context describes
    pub fn check(&self, buffer: &SampleBuffer) -> Result<()> {
        if buffer.sample_rate() != self.sample_rate || buffer.num_channels() != self.channels {
            return Err(MasterError::ContextMismatch {
                expected_channels: self.channels,
                expected_rate: self.sample_rate,
                channels: buffer.num_channels(),
                sample_rate: buffer.sample_rate(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_coefficient_grows_with_sample_rate() {
        let slow = RenderContext::new(44_100, 1).time_coefficient(0.01);
        let fast = RenderContext::new(96_000, 1).time_coefficient(0.01);
        assert!(fast > slow);
        assert!(slow > 0.0 && slow < 1.0);
        assert_eq!(RenderContext::new(44_100, 1).time_coefficient(0.0), 0.0);
    }

    #[test]
    fn test_check_rejects_other_format() {
        let ctx = RenderContext::new(48_000, 2);
        let mono = SampleBuffer::silent(1, 10, 48_000).unwrap();
        let stereo = SampleBuffer::silent(2, 10, 48_000).unwrap();
        assert!(ctx.check(&stereo).is_ok());
        assert!(matches!(
            ctx.check(&mono),
            Err(MasterError::ContextMismatch { .. })
        ));
    }
}
