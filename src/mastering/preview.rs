//! Preview trimming

use crate::engine::SampleBuffer;

/// Default preview length in seconds
pub const DEFAULT_PREVIEW_SECONDS: f64 = 60.0;

/// Keep at most `max_seconds` of audio from the start of `buffer`
///
/// Truncation only: no fade, no resampling. Non-positive or NaN durations
/// give an empty buffer, an infinite one keeps everything.
pub fn trim(buffer: &SampleBuffer, max_seconds: f64) -> SampleBuffer {
    // Float-to-int casts saturate, which covers the NaN and infinite cases
    let limit = (max_seconds * buffer.sample_rate() as f64).floor() as usize;
    buffer.truncated(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_long_buffer() {
        let buffer = SampleBuffer::silent(2, 44_100 * 90, 44_100).unwrap();
        let preview = trim(&buffer, DEFAULT_PREVIEW_SECONDS);
        assert_eq!(preview.len(), 44_100 * 60);
        assert_eq!(preview.num_channels(), 2);
        assert_eq!(preview.sample_rate(), 44_100);
    }

    #[test]
    fn test_trim_short_buffer_is_noop() {
        let buffer = SampleBuffer::sine(440.0, 0.5, 2.0, 48_000, 1).unwrap();
        assert_eq!(trim(&buffer, DEFAULT_PREVIEW_SECONDS), buffer);
    }

    #[test]
    fn test_trim_keeps_leading_samples() {
        let buffer = SampleBuffer::new(vec![vec![0.1, 0.2, 0.3, 0.4]], 2).unwrap();
        let preview = trim(&buffer, 1.0);
        assert_eq!(preview.channel(0).unwrap(), &[0.1, 0.2]);
    }

    #[test]
    fn test_trim_degenerate_durations() {
        let buffer = SampleBuffer::silent(1, 100, 10).unwrap();
        assert_eq!(trim(&buffer, f64::INFINITY).len(), 100);
        assert_eq!(trim(&buffer, f64::NAN).len(), 0);
        assert_eq!(trim(&buffer, -1.0).len(), 0);
    }
}
