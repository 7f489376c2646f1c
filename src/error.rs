//! Error handling for Masterline
//!
//! Only decode failures are meant to reach callers of the pipeline. Stage
//! failures are recovered by the pipeline, which ships the unprocessed audio.

use thiserror::Error;

/// Result type alias for Masterline operations
pub type Result<T> = std::result::Result<T, MasterError>;

/// Main error type for Masterline operations
#[derive(Error, Debug)]
pub enum MasterError {
    // Decode Errors
    #[error("Could not decode audio: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Buffer Errors
    #[error("Invalid sample buffer: {reason}")]
    InvalidBuffer { reason: String },

    // Render Errors
    #[error("Stage '{stage}' has invalid {param}: {value}")]
    InvalidParameter {
        stage: String,
        param: String,
        value: String,
    },

    #[error("Stage '{stage}' produced invalid audio (NaN/Inf)")]
    NonFiniteOutput { stage: String },

    #[error("Render context expects {expected_channels} ch @ {expected_rate} Hz, buffer is {channels} ch @ {sample_rate} Hz")]
    ContextMismatch {
        expected_channels: usize,
        expected_rate: u32,
        channels: usize,
        sample_rate: u32,
    },

    // Output Errors
    #[error("WAV encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[cfg(feature = "async-host")]
    #[error("Background task failed: {reason}")]
    Task { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MasterError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            MasterError::Decode { .. } => "DECODE_FAILURE",
            MasterError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            MasterError::EmptyAudio => "EMPTY_AUDIO",
            MasterError::InvalidBuffer { .. } => "INVALID_BUFFER",
            MasterError::InvalidParameter { .. } => "INVALID_PARAMETER",
            MasterError::NonFiniteOutput { .. } => "NON_FINITE_OUTPUT",
            MasterError::ContextMismatch { .. } => "CONTEXT_MISMATCH",
            MasterError::Encode { .. } => "ENCODE_FAILURE",
            MasterError::InvalidConfig { .. } => "INVALID_CONFIG",
            #[cfg(feature = "async-host")]
            MasterError::Task { .. } => "TASK_FAILURE",
            MasterError::Io(_) => "IO_ERROR",
            MasterError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is a render failure the pipeline can recover from
    /// by delivering the unprocessed input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MasterError::InvalidParameter { .. }
                | MasterError::NonFiniteOutput { .. }
                | MasterError::ContextMismatch { .. }
        )
    }

    /// Shorthand for a decode failure without an underlying source
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        MasterError::Decode {
            reason: reason.into(),
            source: None,
        }
    }
}

impl From<hound::Error> for MasterError {
    fn from(err: hound::Error) -> Self {
        MasterError::Encode {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MasterError::decode("truncated header");
        assert_eq!(err.error_code(), "DECODE_FAILURE");
        assert_eq!(err.to_string(), "Could not decode audio: truncated header");
    }

    #[test]
    fn test_render_failures_are_recoverable() {
        let err = MasterError::NonFiniteOutput {
            stage: "makeup_gain".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(!MasterError::EmptyAudio.is_recoverable());
        assert!(!MasterError::decode("bad").is_recoverable());
    }
}
