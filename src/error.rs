//! Error handling for Aberrant
//!
//! Errors only surface from non-realtime paths: buffer construction, file I/O,
//! cross-buffer operations and config loading. The per-sample pipeline has no
//! failure path; parameters are clamped instead of rejected.

use thiserror::Error;

/// Result type alias for Aberrant operations
pub type Result<T> = std::result::Result<T, AberrantError>;

/// Main error type for Aberrant operations
#[derive(Error, Debug)]
pub enum AberrantError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read audio from {path}: {source}")]
    AudioRead {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write audio to {path}: {source}")]
    AudioWrite {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Unsupported audio format in {path}: {details}")]
    UnsupportedFormat { path: String, details: String },

    // Construction Errors
    #[error("Invalid sample rate: {sample_rate} Hz (must be > 0)")]
    InvalidSampleRate { sample_rate: u32 },

    #[error("Invalid channel count: {channels} (must be 1-16)")]
    InvalidChannelCount { channels: u16 },

    #[error("Sample count {samples} is not divisible by channel count {channels}")]
    InvalidSampleCount { samples: usize, channels: u16 },

    // Cross-buffer Errors
    #[error("Buffer mismatch in {operation}: {details}")]
    BufferMismatch {
        operation: &'static str,
        details: String,
    },

    // Configuration Errors
    #[error("Invalid configuration in {path}: {reason}")]
    Config { path: String, reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AberrantError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            AberrantError::FileNotFound { .. } => "FILE_NOT_FOUND",
            AberrantError::AudioRead { .. } => "AUDIO_READ",
            AberrantError::AudioWrite { .. } => "AUDIO_WRITE",
            AberrantError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AberrantError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
            AberrantError::InvalidChannelCount { .. } => "INVALID_CHANNEL_COUNT",
            AberrantError::InvalidSampleCount { .. } => "INVALID_SAMPLE_COUNT",
            AberrantError::BufferMismatch { .. } => "BUFFER_MISMATCH",
            AberrantError::Config { .. } => "CONFIG_ERROR",
            AberrantError::Io(_) => "IO_ERROR",
        }
    }

    /// Check if the caller can reasonably retry after fixing its input
    ///
    /// Construction and mismatch errors are programming errors in the setup
    /// code and are not considered recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AberrantError::FileNotFound { .. }
                | AberrantError::AudioRead { .. }
                | AberrantError::AudioWrite { .. }
                | AberrantError::UnsupportedFormat { .. }
                | AberrantError::Config { .. }
                | AberrantError::Io(_)
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            AberrantError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the anchor audio was rendered before loading the voice",
            ],
            AberrantError::AudioRead { .. } | AberrantError::UnsupportedFormat { .. } => vec![
                "Convert the anchor audio to PCM or float WAV",
                "Use at most 16 channels",
                "The file may be truncated - re-export it from the source",
            ],
            AberrantError::AudioWrite { .. } => vec![
                "Check the output directory exists and is writable",
                "Free up disk space",
            ],
            AberrantError::BufferMismatch { .. } => vec![
                "Resample or remix the buffer before mixing or appending",
                "Both buffers must share sample rate and channel count",
            ],
            AberrantError::Config { .. } => vec![
                "Validate the config file as JSON",
                "Remove unknown fields or fall back to defaults",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AberrantError::FileNotFound {
            path: "voice.wav".to_string(),
        };
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
        assert!(err.to_string().contains("voice.wav"));
    }

    #[test]
    fn test_mismatch_not_recoverable() {
        let err = AberrantError::BufferMismatch {
            operation: "mix_from",
            details: "44100 Hz vs 48000 Hz".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AberrantError = io.into();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.is_recoverable());
    }
}
