//! Biquad filter (high-pass, low-pass, notch, peaking)
//!
//! Second-order IIR sections designed with the Audio EQ Cookbook formulas.
//! Each channel is filtered independently with its own state.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::engine::{RenderContext, SampleBuffer};
use crate::error::{MasterError, Result};

/// Response shape of a biquad section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Remove below frequency
    HighPass,
    /// Remove above frequency
    LowPass,
    /// Narrow rejection at frequency
    Notch,
    /// Bell curve boost/cut
    Peaking,
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
/// (normalized by a0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Unity pass-through
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Design a section for the given sample rate
    ///
    /// `gain_db` is only used by [`FilterKind::Peaking`]. Frequencies at or
    /// above Nyquist cannot be realised: peaking, notch and low-pass become a
    /// pass-through, high-pass silences the signal.
    ///
    /// # Errors
    /// * `InvalidParameter` - non-finite or non-positive frequency/Q, non-finite gain
    pub fn design(
        kind: FilterKind,
        sample_rate: u32,
        frequency: f32,
        q: f32,
        gain_db: f32,
    ) -> Result<Self> {
        let invalid = |param: &str, value: f32| MasterError::InvalidParameter {
            stage: format!("{:?}", kind),
            param: param.to_string(),
            value: value.to_string(),
        };

        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(invalid("frequency", frequency));
        }
        if !q.is_finite() || q <= 0.0 {
            return Err(invalid("q", q));
        }
        if !gain_db.is_finite() {
            return Err(invalid("gain_db", gain_db));
        }

        let sample_rate = sample_rate as f64;
        let nyquist = sample_rate / 2.0;
        let freq = frequency as f64;

        if freq >= nyquist {
            return Ok(match kind {
                FilterKind::HighPass => BiquadCoeffs {
                    b0: 0.0,
                    ..Self::IDENTITY
                },
                _ => Self::IDENTITY,
            });
        }

        let q = q as f64;
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::Notch => (
                1.0,
                -2.0 * cos_w0,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::Peaking => {
                let a = 10.0_f64.powf(gain_db as f64 / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        };

        Ok(BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        })
    }

    /// Magnitude response in dB at a frequency
    pub fn magnitude_db(&self, frequency: f64, sample_rate: u32) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate as f64;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        20.0 * (num / den).log10()
    }
}

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Direct Form I
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Run a designed section over every channel of a buffer
pub fn apply_biquad(buffer: &SampleBuffer, coeffs: &BiquadCoeffs) -> SampleBuffer {
    buffer.map_channels(|_, samples| {
        let mut state = BiquadState::default();
        samples
            .iter()
            .map(|&s| state.process(s as f64, coeffs) as f32)
            .collect()
    })
}

/// Design and apply a filter in one step
pub fn filter(
    buffer: &SampleBuffer,
    ctx: &RenderContext,
    kind: FilterKind,
    frequency: f32,
    q: f32,
    gain_db: f32,
) -> Result<SampleBuffer> {
    let coeffs = BiquadCoeffs::design(kind, ctx.sample_rate, frequency, q, gain_db)?;
    Ok(apply_biquad(buffer, &coeffs))
}
