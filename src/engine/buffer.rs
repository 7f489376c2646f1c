//! Sample Buffer
//!
//! Multichannel 32-bit float PCM container used by every stage of the
//! mastering pipeline. Buffers are value types: transformations build a new
//! buffer and never touch the one they were given.

use crate::error::{MasterError, Result};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `f32::NEG_INFINITY` for zero or negative input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Root-mean-square level of a slice of samples (linear)
///
/// An empty slice has an RMS of 0.0.
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

// ============================================================================
// Sample Buffer
// ============================================================================

/// Non-interleaved multichannel audio
///
/// Invariant: at least one channel, every channel holds exactly `len()`
/// samples, and the sample rate is non-zero.
///
/// # Example
/// ```
/// use masterline::engine::SampleBuffer;
///
/// let buffer = SampleBuffer::silent(2, 44_100, 44_100).unwrap();
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.len(), 44_100);
/// assert_eq!(buffer.duration_secs(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a buffer from per-channel sample data
    ///
    /// # Errors
    /// * `InvalidBuffer` - no channels, unequal channel lengths, or a zero sample rate
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(MasterError::InvalidBuffer {
                reason: "buffer must have at least one channel".to_string(),
            });
        }

        if sample_rate == 0 {
            return Err(MasterError::InvalidBuffer {
                reason: "sample rate must be non-zero".to_string(),
            });
        }

        let length = channels[0].len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != length)
        {
            return Err(MasterError::InvalidBuffer {
                reason: format!(
                    "channel {} has {} samples, channel 0 has {}",
                    index,
                    channel.len(),
                    length
                ),
            });
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a buffer of silence
    pub fn silent(num_channels: usize, length: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; length]; num_channels], sample_rate)
    }

    /// Create a buffer from interleaved sample data (L, R, L, R, ... for stereo)
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 || interleaved.len() % num_channels != 0 {
            return Err(MasterError::InvalidBuffer {
                reason: format!(
                    "interleaved length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let frames = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(channels, sample_rate)
    }

    /// Generate a sine tone on every channel
    pub fn sine(
        frequency: f32,
        amplitude: f32,
        duration_secs: f64,
        sample_rate: u32,
        num_channels: usize,
    ) -> Result<Self> {
        let length = (duration_secs * sample_rate as f64).round() as usize;
        let step = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;
        let tone: Vec<f32> = (0..length)
            .map(|i| (amplitude as f64 * (step * i as f64).sin()) as f32)
            .collect();

        Self::new(vec![tone; num_channels], sample_rate)
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.num_channels() * self.len());
        for index in 0..self.len() {
            for channel in &self.channels {
                interleaved.push(channel[index]);
            }
        }
        interleaved
    }

    /// Number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Check whether the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Samples of one channel, or `None` if the index is out of range
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channels
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Build a new buffer by transforming each channel independently
    ///
    /// The closure must return a channel of the same length.
    pub fn map_channels<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, &[f32]) -> Vec<f32>,
    {
        let channels: Vec<Vec<f32>> = self
            .channels
            .iter()
            .enumerate()
            .map(|(index, channel)| f(index, channel))
            .collect();

        debug_assert!(channels.iter().all(|c| c.len() == self.len()));
        Self {
            channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Build a new buffer holding the first `length` samples of every channel
    ///
    /// A `length` beyond the end keeps the whole buffer.
    pub fn truncated(&self, length: usize) -> Self {
        let length = length.min(self.len());
        Self {
            channels: self
                .channels
                .iter()
                .map(|channel| channel[..length].to_vec())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Check that every sample is finite
    pub fn is_finite(&self) -> bool {
        self.channels
            .iter()
            .flat_map(|channel| channel.iter())
            .all(|s| s.is_finite())
    }

    /// Peak absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// RMS level of one channel in dB
    pub fn rms_db(&self, channel: usize) -> f32 {
        match self.channel(channel) {
            Some(samples) => linear_to_db(rms(samples) as f32),
            None => f32::NEG_INFINITY,
        }
    }
}
