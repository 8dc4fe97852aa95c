use sc_core::config::AnalyserConfig;
use sc_core::error::CoreError;

use crate::ring::RingArena;

/// Per-band beat detection against an adaptive percentile of recent energy.
///
/// The spectrum is split into `band_count` contiguous equal bands. Each band
/// keeps a ring of its last `beat_window` energies; a band beats when its
/// current energy exceeds the `beat_threshold` percentile of that ring.
///
/// # Example
/// ```
/// use sc_audio::beat::BeatDetector;
/// use sc_core::config::AnalyserConfig;
///
/// let mut detector = BeatDetector::new(&AnalyserConfig::default()).unwrap();
/// let spectrum = vec![0.0f32; 1024];
/// let (volume, beats) = detector.estimate(&spectrum);
/// assert_eq!(volume, 0.0);
/// assert_eq!(beats.len(), 16);
/// ```
pub struct BeatDetector {
    block_size: usize,
    band_size: usize,
    /// Position of the threshold sample inside the sorted window.
    cutoff: usize,
    /// Energy history, one lane per band.
    history: RingArena<f32>,
    /// Sort buffer for the threshold lookup (pre-allocated, reused).
    scratch: Vec<f32>,
    beats: Vec<f32>,
}

impl BeatDetector {
    /// Create a beat detector sized from `config`.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub fn new(config: &AnalyserConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Size the history from an already validated `config`.
    pub(crate) fn build(config: &AnalyserConfig) -> Self {
        let window = config.beat_window();
        log::debug!(
            "BeatDetector: {} bands of {} bins, window {} blocks, cutoff {}",
            config.band_count,
            config.band_size(),
            window,
            config.cutoff_index()
        );
        Self {
            block_size: config.block_size,
            band_size: config.band_size(),
            cutoff: config.cutoff_index(),
            history: RingArena::new(config.band_count, window, 0.0),
            scratch: vec![0.0; window],
            beats: vec![0.0; config.band_count],
        }
    }

    /// Process one spectrum block.
    ///
    /// Returns `(volume, beats)`. `volume` is `sqrt(Σ a²) / N` over the whole
    /// spectrum and is computed even when beat detection is disabled.
    ///
    /// # Panics
    /// Panics if `spectrum.len()` differs from the configured block size.
    pub fn estimate(&mut self, spectrum: &[f32]) -> (f32, &[f32]) {
        assert_eq!(
            spectrum.len(),
            self.block_size,
            "spectrum length must equal the configured block size"
        );

        let volume = root_energy(spectrum) / self.block_size as f32;

        let bands = self.history.lanes();
        for i in 0..bands {
            let threshold = self.threshold(i);
            let band = &spectrum[i * self.band_size..(i + 1) * self.band_size];
            let energy = root_energy(band) / self.band_size as f32;

            self.beats[i] = if energy > threshold { energy } else { 0.0 };
            self.history.write(i, energy);
        }
        if bands > 0 {
            self.history.advance();
        }

        (volume, &self.beats)
    }

    /// Current adaptive threshold of `band`: its history sorted ascending,
    /// sampled at the cutoff index.
    ///
    /// # Panics
    /// Panics if `band >= band_count`.
    pub fn threshold(&mut self, band: usize) -> f32 {
        self.scratch.copy_from_slice(self.history.lane(band));
        self.scratch.sort_unstable_by(f32::total_cmp);
        self.scratch[self.cutoff]
    }

    /// Beat outputs of the last processed block.
    #[must_use]
    pub fn beats(&self) -> &[f32] {
        &self.beats
    }

    /// Number of bands (0 when disabled).
    #[must_use]
    pub fn band_count(&self) -> usize {
        self.beats.len()
    }
}

/// `sqrt(Σ a²)` over a slice.
#[inline(always)]
fn root_energy(bins: &[f32]) -> f32 {
    bins.iter().map(|a| a * a).sum::<f32>().sqrt()
}
