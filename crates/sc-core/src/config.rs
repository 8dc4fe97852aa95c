use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Analysis configuration, fixed at estimator construction.
///
/// Serialisable in TOML. Every field has a sane default matching a Web-Audio
/// analyser with `fftSize = 2048` at 44.1 kHz.
///
/// # Example
/// ```
/// use sc_core::config::AnalyserConfig;
/// let config = AnalyserConfig::default();
/// assert_eq!(config.band_count, 16);
/// assert_eq!(config.pitch_count, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AnalyserConfig {
    // === Identity ===
    /// Namespace; output keys are prefixed with `"<name>_"` when non-empty.
    pub name: String,

    // === Input ===
    /// Sample rate of the captured signal in Hz.
    pub sample_rate: u32,
    /// Spectrum length N (frequency bins per block).
    pub block_size: usize,

    // === Beat detection ===
    /// Number of contiguous bands. 0 disables beat detection.
    pub band_count: usize,
    /// Length of the per-band energy history, in seconds.
    pub beat_window_secs: f32,
    /// Percentile of the history a band must exceed [0.5, 1.0]. Higher is stricter.
    pub beat_threshold: f32,

    // === Pitch detection ===
    /// Number of pitches reported per block. 0 disables pitch detection.
    pub pitch_count: usize,
    /// Highest detectable pitch in Hz; bounds the lowest quefrency scanned.
    pub max_pitch: f32,
    /// Length of the pitch histogram window, in seconds.
    pub pitch_window_secs: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            sample_rate: 44100,
            block_size: 1024,
            band_count: 16,
            beat_window_secs: 1.0,
            beat_threshold: 0.8,
            pitch_count: 4,
            max_pitch: 10000.0,
            pitch_window_secs: 0.25,
        }
    }
}

/// Longest history ring, in blocks (about 3.4 hours at the default rate).
pub const MAX_WINDOW_BLOCKS: usize = 1 << 19;

/// Number of blocks covering `secs` seconds: `ceil(secs · sample_rate / N)`.
///
/// Returns 0 for non-finite or non-positive durations.
fn blocks_for(secs: f32, sample_rate: u32, block_size: usize) -> usize {
    if !secs.is_finite() || block_size == 0 {
        return 0;
    }
    let blocks = (f64::from(secs) * f64::from(sample_rate) / block_size as f64).ceil();
    if blocks < 1.0 { 0 } else { blocks as usize }
}

impl AnalyserConfig {
    /// Capacity of each band's energy history ring.
    ///
    /// # Example
    /// ```
    /// use sc_core::config::AnalyserConfig;
    /// // ceil(1.0 * 44100 / 1024) = 44
    /// assert_eq!(AnalyserConfig::default().beat_window(), 44);
    /// ```
    #[must_use]
    pub fn beat_window(&self) -> usize {
        blocks_for(self.beat_window_secs, self.sample_rate, self.block_size)
    }

    /// Capacity of each rank's pitch history ring.
    ///
    /// # Example
    /// ```
    /// use sc_core::config::AnalyserConfig;
    /// // ceil(0.25 * 44100 / 1024) = 11
    /// assert_eq!(AnalyserConfig::default().pitch_window(), 11);
    /// ```
    #[must_use]
    pub fn pitch_window(&self) -> usize {
        blocks_for(self.pitch_window_secs, self.sample_rate, self.block_size)
    }

    /// Bins per band, `floor(N / band_count)`. 0 when beat detection is disabled.
    #[must_use]
    pub fn band_size(&self) -> usize {
        self.block_size.checked_div(self.band_count).unwrap_or(0)
    }

    /// Position of the threshold sample inside a sorted beat window.
    ///
    /// # Example
    /// ```
    /// use sc_core::config::AnalyserConfig;
    /// let config = AnalyserConfig {
    ///     sample_rate: 5120,
    ///     block_size: 1024,
    ///     ..AnalyserConfig::default()
    /// };
    /// assert_eq!(config.beat_window(), 5);
    /// assert_eq!(config.cutoff_index(), 3); // floor(4 * 0.8)
    /// ```
    #[must_use]
    pub fn cutoff_index(&self) -> usize {
        let last = self.beat_window().saturating_sub(1);
        let idx = (last as f64 * f64::from(self.beat_threshold.clamp(0.0, 1.0))).floor() as usize;
        idx.min(last)
    }

    /// First quefrency scanned for pitch peaks, `min(ceil(sample_rate / max_pitch), N/2)`.
    #[must_use]
    pub fn start_quefrency(&self) -> usize {
        let half = self.block_size / 2;
        if !(self.max_pitch.is_finite() && self.max_pitch > 0.0) {
            return half;
        }
        let q = (f64::from(self.sample_rate) / f64::from(self.max_pitch)).ceil() as usize;
        q.min(half)
    }

    /// Output key prefix: `"<name>_"`, or empty when unnamed.
    #[must_use]
    pub fn prefix(&self) -> String {
        if self.name.is_empty() {
            String::new()
        } else {
            format!("{}_", self.name)
        }
    }

    /// Check every construction-time constraint.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.block_size < 2 || self.block_size % 2 != 0 {
            return Err(CoreError::Config(format!(
                "block_size must be a positive even length, got {}",
                self.block_size
            )));
        }
        if self.sample_rate == 0 {
            return Err(CoreError::Config("sample_rate must be > 0".into()));
        }
        if self.band_count > self.block_size {
            return Err(CoreError::Config(format!(
                "band_count {} exceeds block_size {}",
                self.band_count, self.block_size
            )));
        }
        if self.beat_window() < 1 {
            return Err(CoreError::Config(format!(
                "beat window of {}s spans less than one block",
                self.beat_window_secs
            )));
        }
        if self.pitch_window() < 1 {
            return Err(CoreError::Config(format!(
                "pitch window of {}s spans less than one block",
                self.pitch_window_secs
            )));
        }
        check_history("beat", self.band_count, self.beat_window())?;
        check_history("pitch", self.pitch_count, self.pitch_window())?;
        if !(0.0..=1.0).contains(&self.beat_threshold) {
            return Err(CoreError::Config(format!(
                "beat_threshold must lie in [0, 1], got {}",
                self.beat_threshold
            )));
        }
        if !(self.max_pitch.is_finite() && self.max_pitch > 0.0) {
            return Err(CoreError::Config(format!(
                "max_pitch must be a positive frequency, got {}",
                self.max_pitch
            )));
        }
        if self.beat_threshold < 0.5 {
            log::warn!(
                "beat_threshold {} is below the median; most blocks will register as beats",
                self.beat_threshold
            );
        }
        Ok(())
    }
}

/// Reject history rings that cannot be allocated as `lanes × window` slots.
fn check_history(kind: &str, lanes: usize, window: usize) -> Result<(), CoreError> {
    if window > MAX_WINDOW_BLOCKS || lanes.checked_mul(window).is_none() {
        return Err(CoreError::Config(format!(
            "{kind} window of {window} blocks exceeds the {MAX_WINDOW_BLOCKS}-block limit"
        )));
    }
    Ok(())
}

/// Intermediate TOML structure for deserialisation with optional values.
#[derive(Deserialize)]
struct ConfigFile {
    analyser: Option<AnalyserSection>,
}

/// `[analyser]` section, all keys optional for partial override.
#[derive(Deserialize)]
struct AnalyserSection {
    name: Option<String>,
    sample_rate: Option<u32>,
    block_size: Option<usize>,
    beats: Option<usize>,
    beat_time: Option<f32>,
    beat_threshold: Option<f32>,
    pitches: Option<usize>,
    max_pitch: Option<f32>,
    pitch_time: Option<f32>,
}

/// Load a TOML file, merge it over the defaults and validate the result.
///
/// # Errors
/// Returns [`CoreError::FileNotFound`] if `path` does not exist, or an error
/// if the file cannot be read, parsed, or fails validation.
///
/// # Example
/// ```no_run
/// use sc_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AnalyserConfig> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;

    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("TOML parse error in {}", path.display()))?;

    let mut config = AnalyserConfig::default();

    if let Some(a) = file.analyser {
        if let Some(v) = a.name {
            config.name = v;
        }
        if let Some(v) = a.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = a.block_size {
            config.block_size = v;
        }
        if let Some(v) = a.beats {
            config.band_count = v;
        }
        if let Some(v) = a.beat_time {
            config.beat_window_secs = v;
        }
        if let Some(v) = a.beat_threshold {
            config.beat_threshold = v;
        }
        if let Some(v) = a.pitches {
            config.pitch_count = v;
        }
        if let Some(v) = a.max_pitch {
            config.max_pitch = v;
        }
        if let Some(v) = a.pitch_time {
            config.pitch_window_secs = v;
        }
    }

    config
        .validate()
        .with_context(|| format!("Invalid analyser section in {}", path.display()))?;
    Ok(config)
}
