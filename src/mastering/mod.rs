//! Mastering Pipeline Module
//!
//! Ties the DSP chains to a complete job:
//! - Chain execution with stage-group progress
//! - Loudness analysis and make-up gain correction
//! - Preview trimming and WAV delivery

pub mod analysis;
pub mod correction;
pub mod executor;
pub mod pipeline;
pub mod preview;
pub mod progress;

#[cfg(feature = "async-host")]
mod asynchronous;

pub use analysis::{analyze, VolumeAnalysis};
pub use correction::{decide, optimal_gain, CorrectionDecision};
pub use executor::{render, render_or_passthrough, render_with_progress, Rendered};
pub use pipeline::{Mastering, MasteringReport, ProcessingResult};
pub use preview::trim;
pub use progress::{NoProgress, ProgressSink, ProgressTracker};
