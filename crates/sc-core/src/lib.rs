/// Configuration, error types and shared structures for spectracue.
///
/// This crate holds the types shared by the analysis crate and the binary:
/// the analyser configuration, the per-block output frame, and the
/// transform trait the pitch detector is generic over.

pub mod config;
pub mod error;
pub mod frame;
pub mod traits;

pub use config::AnalyserConfig;
pub use error::CoreError;
pub use frame::AnalysisFrame;
pub use traits::CepstrumTransform;
