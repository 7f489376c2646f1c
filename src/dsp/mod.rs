//! DSP Stage Library
//!
//! Offline signal-processing primitives and the per-tier chains built from
//! them. Every stage is a pure transform: it takes a buffer and returns a
//! new one.

pub mod biquad;
pub mod chain;
pub mod dynamics;
pub mod gain;
pub mod stage;

pub use biquad::{apply_biquad, BiquadCoeffs, FilterKind};
pub use chain::{build_chain, Chain, ChainStage, StageGroup, Tier, TierProfile, MAKEUP_GAIN_STAGE};
pub use dynamics::{compress, DynamicsParams};
pub use gain::{apply_gain, apply_stereo_widen};
pub use stage::StageSpec;
