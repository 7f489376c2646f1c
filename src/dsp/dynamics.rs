//! Dynamics processor (noise gate, compressor, limiter)
//!
//! Feed-forward design shared by every dynamics stage:
//! - Linked peak detection across channels
//! - Soft-knee gain computer
//! - One-pole attack/release smoothing of the gain
//!
//! Noise gates in the mastering chains are gentle compressors with a very low
//! threshold, so they run through the same processor.

use serde::{Deserialize, Serialize};

use crate::engine::{db_to_linear, linear_to_db, RenderContext, SampleBuffer};
use crate::error::{MasterError, Result};

/// Level used for silent input when converting to dB
const FLOOR_DB: f32 = -120.0;

/// Dynamics parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicsParams {
    /// Threshold level in dB
    pub threshold_db: f32,
    /// Knee width in dB (0 = hard knee)
    ///
    /// The knee is centred on the threshold: gain reduction starts at
    /// `threshold_db - knee_db / 2` and reaches the full ratio at
    /// `threshold_db + knee_db / 2`. Some gain is therefore taken off just
    /// below the threshold.
    pub knee_db: f32,
    /// Compression ratio (e.g. 4.0 for 4:1)
    pub ratio: f32,
    /// Attack time in seconds
    pub attack_secs: f32,
    /// Release time in seconds
    pub release_secs: f32,
}

impl DynamicsParams {
    /// Create a parameter set
    pub const fn new(
        threshold_db: f32,
        knee_db: f32,
        ratio: f32,
        attack_secs: f32,
        release_secs: f32,
    ) -> Self {
        Self {
            threshold_db,
            knee_db,
            ratio,
            attack_secs,
            release_secs,
        }
    }

    /// Check every parameter is usable
    pub fn validate(&self, stage: &str) -> Result<()> {
        let invalid = |param: &str, value: f32| MasterError::InvalidParameter {
            stage: stage.to_string(),
            param: param.to_string(),
            value: value.to_string(),
        };

        if !self.threshold_db.is_finite() {
            return Err(invalid("threshold_db", self.threshold_db));
        }
        if !self.knee_db.is_finite() || self.knee_db < 0.0 {
            return Err(invalid("knee_db", self.knee_db));
        }
        if !self.ratio.is_finite() || self.ratio < 1.0 {
            return Err(invalid("ratio", self.ratio));
        }
        if !self.attack_secs.is_finite() || self.attack_secs < 0.0 {
            return Err(invalid("attack_secs", self.attack_secs));
        }
        if !self.release_secs.is_finite() || self.release_secs < 0.0 {
            return Err(invalid("release_secs", self.release_secs));
        }
        Ok(())
    }

    /// Gain change in dB (zero or negative) for a detector level in dB
    pub fn gain_reduction_db(&self, input_db: f32) -> f32 {
        let threshold = self.threshold_db;
        let knee = self.knee_db;
        let slope = 1.0 / self.ratio - 1.0;
        let overshoot = input_db - threshold;

        if knee > 0.0 && 2.0 * overshoot.abs() <= knee {
            // Quadratic interpolation through the knee
            let x = overshoot + knee / 2.0;
            slope * x * x / (2.0 * knee)
        } else if overshoot > 0.0 {
            slope * overshoot
        } else {
            0.0
        }
    }

    /// Detector level below which no gain change happens
    fn knee_start_db(&self) -> f32 {
        self.threshold_db - self.knee_db / 2.0
    }
}

/// Run a buffer through a dynamics processor
///
/// All channels share one gain envelope, so the stereo image stays put.
pub fn compress(
    buffer: &SampleBuffer,
    ctx: &RenderContext,
    params: &DynamicsParams,
) -> SampleBuffer {
    let attack_coeff = ctx.time_coefficient(params.attack_secs);
    let release_coeff = ctx.time_coefficient(params.release_secs);
    let knee_start = db_to_linear(params.knee_start_db());

    let channels = buffer.channels();
    let length = buffer.len();
    let mut gains = Vec::with_capacity(length);
    let mut current = 1.0_f32;

    for index in 0..length {
        let level = channels
            .iter()
            .map(|channel| channel[index].abs())
            .fold(0.0_f32, f32::max);

        let target = if level > knee_start {
            let level_db = linear_to_db(level).max(FLOOR_DB);
            db_to_linear(params.gain_reduction_db(level_db))
        } else {
            1.0
        };

        if target < current {
            current = attack_coeff * current + (1.0 - attack_coeff) * target;
        } else if target > current {
            current = release_coeff * current + (1.0 - release_coeff) * target;
        }
        gains.push(current);
    }

    buffer.map_channels(|_, samples| {
        samples
            .iter()
            .zip(gains.iter())
            .map(|(s, g)| s * g)
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn comp(threshold_db: f32, knee_db: f32, ratio: f32) -> DynamicsParams {
        DynamicsParams::new(threshold_db, knee_db, ratio, 0.001, 0.05)
    }

    #[test]
    fn test_gain_computer_hard_knee() {
        let params = comp(-20.0, 0.0, 4.0);
        assert_eq!(params.gain_reduction_db(-30.0), 0.0);
        assert_eq!(params.gain_reduction_db(-20.0), 0.0);
        // 8 dB over with 4:1 -> 2 dB over -> -6 dB of gain
        assert_abs_diff_eq!(params.gain_reduction_db(-12.0), -6.0, epsilon = 1e-4);
    }

    #[test]
    fn test_gain_computer_soft_knee() {
        let params = comp(-20.0, 6.0, 4.0);
        assert_eq!(params.gain_reduction_db(-24.0), 0.0);
        assert_abs_diff_eq!(params.gain_reduction_db(-23.0), 0.0, epsilon = 1e-4);

        let mid = params.gain_reduction_db(-20.0);
        assert!(mid < 0.0 && mid > -1.0, "knee should be partial, got {}", mid);

        // Beyond the knee the curve matches the hard-knee line
        assert_abs_diff_eq!(params.gain_reduction_db(-8.0), -9.0, epsilon = 1e-4);
        // And it is continuous at the knee edge
        assert_abs_diff_eq!(
            params.gain_reduction_db(-17.0),
            comp(-20.0, 0.0, 4.0).gain_reduction_db(-17.0),
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_knee_is_centred_on_threshold() {
        let params = comp(-20.0, 6.0, 4.0);

        // Knee opens 3 dB under the threshold
        assert_eq!(params.gain_reduction_db(-23.5), 0.0);
        assert_abs_diff_eq!(params.gain_reduction_db(-23.0), 0.0, epsilon = 1e-6);
        assert!(params.gain_reduction_db(-22.5) < 0.0);
        assert!(params.gain_reduction_db(-20.5) < 0.0);

        // A quarter of the knee's full-ratio reduction at the threshold itself
        assert_abs_diff_eq!(params.gain_reduction_db(-20.0), -0.5625, epsilon = 1e-6);

        // Full ratio from 3 dB over the threshold
        assert_abs_diff_eq!(params.gain_reduction_db(-17.0), -2.25, epsilon = 1e-6);
        assert_abs_diff_eq!(params.gain_reduction_db(-16.0), -3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_below_threshold_is_untouched() {
        let ctx = RenderContext::new(44_100, 1);
        let input = SampleBuffer::sine(440.0, 0.01, 0.1, 44_100, 1).unwrap();
        let output = compress(&input, &ctx, &comp(-10.0, 2.0, 4.0));
        assert_eq!(input, output);
    }

    #[test]
    fn test_limiter_pulls_peaks_down() {
        let ctx = RenderContext::new(44_100, 1);
        let input = SampleBuffer::sine(440.0, 0.9, 0.5, 44_100, 1).unwrap();
        let limiter = DynamicsParams::new(-6.0, 0.0, 25.0, 0.0005, 0.05);
        let output = compress(&input, &ctx, &limiter);

        // After the attack settles, peaks sit near the -6 dB ceiling (~0.5)
        let tail = &output.channel(0).unwrap()[22_050..];
        let peak = tail.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        assert!(peak < 0.6, "peak should be limited, got {}", peak);
        assert!(peak > 0.3, "limiter should not crush the signal, got {}", peak);
    }

    #[test]
    fn test_linked_detection() {
        let ctx = RenderContext::new(44_100, 2);
        let input = SampleBuffer::new(vec![vec![0.9; 4_410], vec![0.1; 4_410]], 44_100).unwrap();
        let output = compress(&input, &ctx, &comp(-20.0, 0.0, 4.0));

        // The quiet right channel follows the loud left channel's gain
        let right = output.channel(1).unwrap()[4_000];
        assert!(right < 0.05, "right channel should be reduced, got {}", right);
    }

    #[test]
    fn test_validate() {
        assert!(comp(-25.0, 12.0, 1.5).validate("compressor").is_ok());
        assert!(comp(f32::NAN, 0.0, 2.0).validate("compressor").is_err());
        assert!(comp(-25.0, -1.0, 2.0).validate("compressor").is_err());
        assert!(comp(-25.0, 0.0, 0.5).validate("compressor").is_err());
        let bad_attack = DynamicsParams::new(-25.0, 0.0, 2.0, f32::INFINITY, 0.1);
        assert!(bad_attack.validate("compressor").is_err());
    }
}
