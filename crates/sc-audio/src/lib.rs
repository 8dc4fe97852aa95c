// Spectrum feature extraction for spectracue: adaptive beats and cepstral pitches.

pub mod analyser;
pub mod beat;
pub mod capture;
pub mod cepstrum;
pub mod decode;
pub mod error;
pub mod pitch;
pub mod ring;
pub mod spectrum;

pub use analyser::Analyser;
pub use beat::BeatDetector;
pub use cepstrum::RealFftCepstrum;
pub use pitch::{PitchCandidate, PitchDetector};
