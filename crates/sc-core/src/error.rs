use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, PartialEq)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// A spectrum block did not have the configured length.
    #[error("Spectrum length mismatch: expected {expected} bins, got {actual}")]
    SpectrumLength {
        /// Configured block length N.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
}
