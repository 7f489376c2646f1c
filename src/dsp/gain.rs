//! Gain and stereo width stages
//!
//! Both are memoryless: a constant factor over the whole buffer.

use crate::engine::SampleBuffer;
use crate::error::{MasterError, Result};

fn check_factor(stage: &str, param: &str, factor: f32) -> Result<()> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(MasterError::InvalidParameter {
            stage: stage.to_string(),
            param: param.to_string(),
            value: factor.to_string(),
        });
    }
    Ok(())
}

/// Multiply every sample by a linear factor
///
/// # Errors
/// * `InvalidParameter` - negative or non-finite factor
pub fn apply_gain(buffer: &SampleBuffer, factor: f32) -> Result<SampleBuffer> {
    check_factor("gain", "factor", factor)?;
    Ok(buffer.map_channels(|_, samples| samples.iter().map(|s| s * factor).collect()))
}

/// Widen the stereo image by scaling the side signal
///
/// The first two channels are treated as left/right:
/// `mid = (L + R) / 2`, `side = (L - R) / 2 * width`. Any further channels
/// pass through, and a mono buffer is returned unchanged.
///
/// # Errors
/// * `InvalidParameter` - negative or non-finite width
pub fn apply_stereo_widen(buffer: &SampleBuffer, width: f32) -> Result<SampleBuffer> {
    check_factor("stereo_widen", "width", width)?;

    let (Some(left), Some(right)) = (buffer.channel(0), buffer.channel(1)) else {
        return Ok(buffer.clone());
    };

    let mut new_left = Vec::with_capacity(left.len());
    let mut new_right = Vec::with_capacity(right.len());
    for (&l, &r) in left.iter().zip(right) {
        let mid = (l + r) * 0.5;
        let side = (l - r) * 0.5 * width;
        new_left.push(mid + side);
        new_right.push(mid - side);
    }

    Ok(buffer.map_channels(|index, samples| match index {
        0 => std::mem::take(&mut new_left),
        1 => std::mem::take(&mut new_right),
        _ => samples.to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_gain_scales_all_channels() {
        let buffer = SampleBuffer::new(vec![vec![0.5, -0.25], vec![0.1, 0.2]], 48_000).unwrap();
        let out = apply_gain(&buffer, 2.0).unwrap();
        assert_eq!(out.channel(0).unwrap(), &[1.0, -0.5]);
        assert_eq!(out.channel(1).unwrap(), &[0.2, 0.4]);
        // Source buffer untouched
        assert_eq!(buffer.channel(0).unwrap(), &[0.5, -0.25]);
    }

    #[test]
    fn test_gain_rejects_bad_factor() {
        let buffer = SampleBuffer::silent(1, 4, 48_000).unwrap();
        assert!(apply_gain(&buffer, f32::NAN).is_err());
        assert!(apply_gain(&buffer, -1.0).is_err());
    }

    #[test]
    fn test_widen_mono_is_passthrough() {
        let buffer = SampleBuffer::sine(440.0, 0.5, 0.01, 48_000, 1).unwrap();
        assert_eq!(apply_stereo_widen(&buffer, 1.2).unwrap(), buffer);
    }

    #[test]
    fn test_widen_keeps_mid_and_scales_side() {
        let buffer = SampleBuffer::new(vec![vec![0.6], vec![0.2]], 48_000).unwrap();
        let out = apply_stereo_widen(&buffer, 1.5).unwrap();
        let (l, r) = (out.channel(0).unwrap()[0], out.channel(1).unwrap()[0]);
        assert_abs_diff_eq!((l + r) / 2.0, 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!((l - r) / 2.0, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_widen_identical_channels_unchanged() {
        let buffer = SampleBuffer::sine(440.0, 0.5, 0.01, 48_000, 2).unwrap();
        let out = apply_stereo_widen(&buffer, 1.2).unwrap();
        for (a, b) in buffer.channels()[0].iter().zip(out.channels()[0].iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }
}
