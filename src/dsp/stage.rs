//! Stage specifications
//!
//! Every processing step a chain can contain is one variant of [`StageSpec`].
//! Specs are plain values; all per-render state (filter memory, envelopes)
//! lives inside [`StageSpec::apply`] for the duration of one call.

use serde::{Deserialize, Serialize};

use super::biquad::{filter, FilterKind};
use super::dynamics::{compress, DynamicsParams};
use super::gain::{apply_gain, apply_stereo_widen};
use crate::engine::{RenderContext, SampleBuffer};
use crate::error::Result;

/// One processing stage and its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageSpec {
    HighPass { frequency_hz: f32, q: f32 },
    LowPass { frequency_hz: f32, q: f32 },
    Notch { frequency_hz: f32, q: f32 },
    Peaking { frequency_hz: f32, q: f32, gain_db: f32 },
    /// Gentle downward compressor at a very low threshold
    NoiseGate(DynamicsParams),
    Compressor(DynamicsParams),
    Limiter(DynamicsParams),
    /// Linear scalar gain
    Gain { factor: f32 },
    /// Side-signal scaling on the first channel pair
    StereoWiden { width: f32 },
}

impl StageSpec {
    /// Short kind name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            StageSpec::HighPass { .. } => "high_pass",
            StageSpec::LowPass { .. } => "low_pass",
            StageSpec::Notch { .. } => "notch",
            StageSpec::Peaking { .. } => "peaking",
            StageSpec::NoiseGate(_) => "noise_gate",
            StageSpec::Compressor(_) => "compressor",
            StageSpec::Limiter(_) => "limiter",
            StageSpec::Gain { .. } => "gain",
            StageSpec::StereoWiden { .. } => "stereo_widen",
        }
    }

    /// Check the parameters without rendering anything
    ///
    /// Filters are designed against `ctx` so Nyquist handling matches what
    /// [`apply`](Self::apply) would do.
    pub fn validate(&self, ctx: &RenderContext) -> Result<()> {
        let silence = SampleBuffer::silent(ctx.channels.max(1), 0, ctx.sample_rate.max(1))?;
        match *self {
            StageSpec::NoiseGate(params)
            | StageSpec::Compressor(params)
            | StageSpec::Limiter(params) => params.validate(self.kind()),
            // Zero-length render: exercises every parameter check
            _ => self.apply(&silence, ctx).map(|_| ()),
        }
    }

    /// Render a buffer through this stage, producing a new buffer
    ///
    /// # Errors
    /// * `InvalidParameter` - a parameter is non-finite or out of range
    pub fn apply(&self, buffer: &SampleBuffer, ctx: &RenderContext) -> Result<SampleBuffer> {
        match *self {
            StageSpec::HighPass { frequency_hz, q } => {
                filter(buffer, ctx, FilterKind::HighPass, frequency_hz, q, 0.0)
            }
            StageSpec::LowPass { frequency_hz, q } => {
                filter(buffer, ctx, FilterKind::LowPass, frequency_hz, q, 0.0)
            }
            StageSpec::Notch { frequency_hz, q } => {
                filter(buffer, ctx, FilterKind::Notch, frequency_hz, q, 0.0)
            }
            StageSpec::Peaking {
                frequency_hz,
                q,
                gain_db,
            } => filter(buffer, ctx, FilterKind::Peaking, frequency_hz, q, gain_db),
            StageSpec::NoiseGate(params)
            | StageSpec::Compressor(params)
            | StageSpec::Limiter(params) => {
                params.validate(self.kind())?;
                Ok(compress(buffer, ctx, &params))
            }
            StageSpec::Gain { factor } => apply_gain(buffer, factor),
            StageSpec::StereoWiden { width } => apply_stereo_widen(buffer, width),
        }
    }
}
