//! Audio Engine Module
//!
//! Core audio plumbing shared by the DSP stages and the mastering pipeline:
//! - Sample buffer value type
//! - Render context
//! - Decoding and WAV encoding

pub mod buffer;
pub mod context;
pub mod io;

pub use buffer::{db_to_linear, linear_to_db, rms, SampleBuffer};
pub use context::RenderContext;
pub use io::{
    decode_audio, encode_wav, encoded_len, quantize_pcm16, AudioDecoder, SymphoniaDecoder,
    WAV_HEADER_LEN,
};
