//! Audio I/O for Masterline
//!
//! Decoding sits behind the [`AudioDecoder`] seam so hosts can plug in their
//! own codec; the default implementation uses symphonia. Encoding always
//! produces canonical 16-bit PCM WAV (44-byte header) through hound.

use std::io::{Cursor, ErrorKind};

use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer as DecodedSamples;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::engine::buffer::SampleBuffer;
use crate::error::{MasterError, Result};

/// Maximum channel count the delivery format supports
pub const MAX_CHANNELS: usize = 2;

/// Size of the canonical PCM WAV header in bytes
pub const WAV_HEADER_LEN: usize = 44;

/// Full-scale value for 16-bit quantization
const PCM16_SCALE: f32 = 32767.0;

// ============================================================================
// Decoding
// ============================================================================

/// Turns encoded audio bytes into a [`SampleBuffer`]
pub trait AudioDecoder: Send + Sync {
    /// Decode a complete file
    ///
    /// `type_hint` is a MIME type (`audio/mpeg`) or file extension (`mp3`).
    fn decode(&self, bytes: &[u8], type_hint: Option<&str>) -> Result<SampleBuffer>;
}

/// Default decoder backed by symphonia
///
/// Supports WAV, AIFF, FLAC, MP3, OGG/Vorbis, AAC and the other formats
/// symphonia ships with.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8], type_hint: Option<&str>) -> Result<SampleBuffer> {
        decode_audio(bytes, type_hint)
    }
}

fn build_hint(type_hint: Option<&str>) -> Hint {
    let mut hint = Hint::new();
    if let Some(value) = type_hint.map(str::trim).filter(|v| !v.is_empty()) {
        if value.contains('/') {
            hint.mime_type(value);
        } else {
            hint.with_extension(value.trim_start_matches('.'));
        }
    }
    hint
}

/// Decode a complete audio file held in memory
///
/// # Errors
/// * `Decode` - the bytes are not a recognised or intact audio stream
/// * `UnsupportedFormat` - more than two channels
/// * `EmptyAudio` - the stream decoded to zero samples
pub fn decode_audio(bytes: &[u8], type_hint: Option<&str>) -> Result<SampleBuffer> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &build_hint(type_hint),
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MasterError::Decode {
            reason: format!("unrecognised audio stream: {}", e),
            source: Some(Box::new(e)),
        })?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| MasterError::decode("no audio track found"))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MasterError::Decode {
            reason: format!("no decoder for track: {}", e),
            source: Some(Box::new(e)),
        })?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut num_channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => {
                return Err(MasterError::Decode {
                    reason: format!("failed to read packet: {}", e),
                    source: Some(Box::new(e)),
                })
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                warn!(reason, "skipping corrupt audio packet");
                continue;
            }
            Err(e) => {
                return Err(MasterError::Decode {
                    reason: format!("decoder failed: {}", e),
                    source: Some(Box::new(e)),
                })
            }
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        num_channels = spec.channels.count();

        let mut samples = DecodedSamples::<f32>::new(decoded.capacity() as u64, spec);
        samples.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(samples.samples());
    }

    if num_channels > MAX_CHANNELS {
        return Err(MasterError::UnsupportedFormat {
            format: format!(
                "{}-channel audio (only mono/stereo supported)",
                num_channels
            ),
        });
    }

    if interleaved.is_empty() || num_channels == 0 {
        return Err(MasterError::EmptyAudio);
    }

    let buffer = SampleBuffer::from_interleaved(&interleaved, num_channels, sample_rate)
        .map_err(|e| MasterError::decode(e.to_string()))?;

    debug!(
        sample_rate,
        channels = num_channels,
        frames = buffer.len(),
        "audio decode complete"
    );

    Ok(buffer)
}

// ============================================================================
// Encoding
// ============================================================================

/// Quantize a float sample to signed 16-bit PCM
///
/// Samples are clamped to [-1, 1] and rounded, so 1.0 maps to 32767.
#[inline]
pub fn quantize_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * PCM16_SCALE).round() as i16
}

/// Number of bytes a buffer occupies once encoded
pub fn encoded_len(buffer: &SampleBuffer) -> usize {
    WAV_HEADER_LEN + buffer.len() * buffer.num_channels() * 2
}

/// Encode a buffer as 16-bit little-endian PCM WAV
///
/// # Errors
/// * `UnsupportedFormat` - more than two channels (the canonical header
///   cannot describe them)
/// * `Encode` - the WAV writer failed
pub fn encode_wav(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    if buffer.num_channels() > MAX_CHANNELS {
        return Err(MasterError::UnsupportedFormat {
            format: format!(
                "{}-channel audio cannot be written as canonical PCM WAV",
                buffer.num_channels()
            ),
        });
    }

    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(encoded_len(buffer)));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for index in 0..buffer.len() {
            for channel in buffer.channels() {
                writer.write_sample(quantize_pcm16(channel[index]))?;
            }
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
