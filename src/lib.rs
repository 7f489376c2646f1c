//! Masterline - Tiered Audio Mastering
//!
//! Masterline turns an uploaded track into a mastered full-length WAV and a
//! short preview using a fixed, deterministic signal chain per tier.
//!
//! # Architecture
//!
//! - `engine`: sample buffers, render context, decoding and WAV encoding
//! - `dsp`: filter, dynamics and gain stages plus the per-tier chains
//! - `mastering`: render, loudness analysis, gain correction, preview, delivery
//!
//! # Example
//!
//! ```no_run
//! use masterline::{Mastering, NoProgress, Tier};
//!
//! let bytes = std::fs::read("song.mp3")?;
//! let result = Mastering::default().process(&bytes, Some("mp3"), Tier::Premium, &mut NoProgress)?;
//! std::fs::write("song_mastered.wav", &result.full)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod mastering;

pub use config::MasteringConfig;
pub use dsp::{build_chain, Chain, StageSpec, Tier};
pub use engine::{AudioDecoder, RenderContext, SampleBuffer, SymphoniaDecoder};
pub use error::{MasterError, Result};
pub use mastering::{
    analyze, render, trim, Mastering, MasteringReport, NoProgress, ProcessingResult, ProgressSink,
    VolumeAnalysis,
};
