use thiserror::Error;

/// Errors originating from the audio capture and decode layers.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found.
    #[error("No audio input device found")]
    NoInputDevice,

    /// Unsupported audio format.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Audio stream error.
    #[error("Audio stream error: {0}")]
    StreamError(String),

    /// Audio decode error.
    #[error("Decode error: {0}")]
    DecodeError(String),
}
