use sc_core::config::AnalyserConfig;
use sc_core::error::CoreError;

use crate::cepstrum::{CepstrumTransform, RealFftCepstrum};
use crate::ring::RingArena;

/// A cepstral peak: quefrency index and its cepstrum value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchCandidate {
    /// Quefrency bin, in `1..N/2`.
    pub quefrency: usize,
    /// Cepstrum value at `quefrency`.
    pub strength: f32,
}

/// Cepstral pitch estimation smoothed by a sliding weighted histogram.
///
/// Each block the top `pitch_count` cepstral peaks vote into a histogram over
/// quefrency bins (rank `j` weighs `1 / (1 + j)`). Votes expire after
/// `pitch_window` blocks. The reported pitches are the best-weighted bins,
/// converted to Hz as `sample_rate / quefrency`.
///
/// Generic over the [`CepstrumTransform`] so callers can inject their own
/// transform primitive; defaults to [`RealFftCepstrum`].
///
/// # Example
/// ```
/// use sc_audio::pitch::PitchDetector;
/// use sc_core::config::AnalyserConfig;
///
/// let mut detector = PitchDetector::new(&AnalyserConfig::default()).unwrap();
/// let pitches = detector.estimate(&vec![0.0f32; 1024]);
/// assert_eq!(pitches, &[0.0; 4]);
/// ```
pub struct PitchDetector<T = RealFftCepstrum> {
    transform: T,
    sample_rate: f32,
    block_size: usize,
    /// Quefrency scan range `[start_q, end_q)`.
    start_q: usize,
    end_q: usize,
    log_spectrum: Vec<f32>,
    cepstrum: Vec<f32>,
    /// Current block's peaks, strongest first.
    candidates: Vec<Option<PitchCandidate>>,
    /// Accumulated vote weight per quefrency bin, `0..N`.
    histogram: Vec<f32>,
    /// Live votes per bin; a bin with no live vote is exactly 0.
    occupancy: Vec<u32>,
    /// Quefrency voted by each rank, one lane per rank.
    history: RingArena<Option<usize>>,
    /// Top-K selection buffer (capacity `pitch_count`).
    ranked: Vec<usize>,
    pitches: Vec<f32>,
}

impl PitchDetector<RealFftCepstrum> {
    /// Create a pitch detector using the realfft-backed transform.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub fn new(config: &AnalyserConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::build(config, RealFftCepstrum::new(config.block_size)))
    }
}

impl<T: CepstrumTransform> PitchDetector<T> {
    /// Create a pitch detector around a caller-supplied transform.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub fn with_transform(config: &AnalyserConfig, transform: T) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::build(config, transform))
    }

    /// Size every buffer from an already validated `config`.
    pub(crate) fn build(config: &AnalyserConfig, transform: T) -> Self {
        let n = config.block_size;
        let k = config.pitch_count;
        let window = config.pitch_window();
        let start_q = config.start_quefrency();
        log::debug!(
            "PitchDetector: {k} pitches, quefrency scan [{start_q}, {}), window {window} blocks",
            n / 2
        );
        Self {
            transform,
            sample_rate: config.sample_rate as f32,
            block_size: n,
            start_q,
            end_q: n / 2,
            log_spectrum: vec![0.0; n],
            cepstrum: vec![0.0; n / 2],
            candidates: vec![None; k],
            histogram: vec![0.0; n],
            occupancy: vec![0; n],
            history: RingArena::new(k, window, None),
            ranked: Vec::with_capacity(k),
            pitches: vec![0.0; k],
        }
    }

    /// Process one spectrum block and return the top pitches in Hz.
    ///
    /// Slots without a detection hold 0.
    ///
    /// # Panics
    /// Panics if `spectrum.len()` differs from the configured block size.
    pub fn estimate(&mut self, spectrum: &[f32]) -> &[f32] {
        assert_eq!(
            spectrum.len(),
            self.block_size,
            "spectrum length must equal the configured block size"
        );

        for (l, &a) in self.log_spectrum.iter_mut().zip(spectrum) {
            *l = a.ln_1p();
        }
        self.transform.transform(&self.log_spectrum, &mut self.cepstrum);

        self.pick_peaks();
        self.update_histogram();
        self.rank();

        &self.pitches
    }

    /// Keep the strongest local maxima of the cepstrum in `candidates`.
    fn pick_peaks(&mut self) {
        self.candidates.fill(None);
        if self.candidates.is_empty() {
            return;
        }

        // Both neighbours must exist.
        let start = self.start_q.max(1);
        let end = self.end_q.saturating_sub(1);
        for i in start..end {
            let a = self.cepstrum[i - 1];
            let b = self.cepstrum[i];
            let c = self.cepstrum[i + 1];
            if b > a && b > c {
                self.insert_candidate(PitchCandidate {
                    quefrency: i,
                    strength: b,
                });
            }
        }
    }

    /// Shift-and-insert into the descending candidate list.
    ///
    /// Strict comparison: an equal strength ranks below the earlier peak.
    #[inline]
    fn insert_candidate(&mut self, candidate: PitchCandidate) {
        let k = self.candidates.len();
        let slot = self
            .candidates
            .iter()
            .position(|c| c.is_none_or(|c| c.strength < candidate.strength));
        if let Some(j) = slot {
            self.candidates.copy_within(j..k - 1, j + 1);
            self.candidates[j] = Some(candidate);
        }
    }

    /// Add this block's votes and retire the votes cast one window ago.
    fn update_histogram(&mut self) {
        let ranks = self.candidates.len();
        if ranks == 0 {
            return;
        }
        for j in 0..ranks {
            let weight = 1.0 / (1.0 + j as f32);
            let q = self.candidates[j].map(|c| c.quefrency);
            if let Some(stale) = self.history.write(j, q) {
                self.retract(stale, weight);
            }
            if let Some(q) = q {
                self.histogram[q] += weight;
                self.occupancy[q] += 1;
            }
        }
        self.history.advance();
    }

    #[inline]
    fn retract(&mut self, q: usize, weight: f32) {
        self.occupancy[q] = self.occupancy[q].saturating_sub(1);
        self.histogram[q] = if self.occupancy[q] == 0 {
            0.0
        } else {
            (self.histogram[q] - weight).max(0.0)
        };
    }

    /// Bounded top-K selection over the histogram, then conversion to Hz.
    ///
    /// Order: weight descending, then quefrency ascending. Bins without
    /// weight never rank.
    fn rank(&mut self) {
        let k = self.pitches.len();
        self.ranked.clear();
        for (q, &w) in self.histogram.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            let pos = self
                .ranked
                .iter()
                .position(|&r| self.histogram[r] < w)
                .unwrap_or(self.ranked.len());
            if pos < k {
                if self.ranked.len() == k {
                    self.ranked.pop();
                }
                self.ranked.insert(pos, q);
            }
        }

        for (j, pitch) in self.pitches.iter_mut().enumerate() {
            *pitch = match self.ranked.get(j) {
                Some(&q) if q != 0 => self.sample_rate / q as f32,
                _ => 0.0,
            };
        }
    }

    /// Pitches of the last processed block.
    #[must_use]
    pub fn pitches(&self) -> &[f32] {
        &self.pitches
    }

    /// Cepstrum of the last processed block (length N/2).
    #[must_use]
    pub fn cepstrum(&self) -> &[f32] {
        &self.cepstrum
    }

    /// Peaks picked from the last processed block, strongest first.
    #[must_use]
    pub fn candidates(&self) -> &[Option<PitchCandidate>] {
        &self.candidates
    }

    /// Accumulated weight of quefrency bin `q`.
    ///
    /// # Panics
    /// Panics if `q >= N`.
    #[must_use]
    pub fn weight(&self, q: usize) -> f32 {
        self.histogram[q]
    }

    /// Whole histogram, indexed by quefrency.
    #[must_use]
    pub fn histogram(&self) -> &[f32] {
        &self.histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Raised cosine with `period` bins: its log spectrum repeats every
    /// `period` bins, so the cepstrum peaks at `N / period`.
    fn harmonic_spectrum(n: usize, period: usize) -> Vec<f32> {
        (0..n)
            .map(|k| {
                let phase = 2.0 * std::f32::consts::PI * (k % period) as f32 / period as f32;
                0.5 + 0.5 * phase.cos()
            })
            .collect()
    }

    /// Emits a fixed cepstrum whatever the input.
    struct FixedCepstrum(Vec<f32>);

    impl CepstrumTransform for FixedCepstrum {
        fn transform(&mut self, _input: &[f32], output: &mut [f32]) {
            output.copy_from_slice(&self.0);
        }
    }

    fn small_config(pitch_count: usize) -> AnalyserConfig {
        // N = 16, window ceil(0.25 * 256 / 16) = 4 blocks, start_q = 1.
        AnalyserConfig {
            sample_rate: 256,
            block_size: 16,
            band_count: 0,
            pitch_count,
            max_pitch: 1000.0,
            ..AnalyserConfig::default()
        }
    }

    #[test]
    fn periodic_spectrum_peaks_at_expected_quefrency() {
        let config = AnalyserConfig::default();
        let mut detector = PitchDetector::new(&config).unwrap();
        let pitches = detector.estimate(&harmonic_spectrum(1024, 16)).to_vec();

        let start = config.start_quefrency();
        let peak = detector.cepstrum()[start..]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i + start);
        assert_eq!(peak, Some(64));
        assert_eq!(detector.candidates()[0].map(|c| c.quefrency), Some(64));
        assert!((pitches[0] - 44100.0 / 64.0).abs() < 1e-3);
    }

    #[test]
    fn candidates_are_ordered_by_strength() {
        let mut cep = vec![0.0f32; 8];
        cep[2] = 0.3;
        cep[4] = 0.9;
        cep[6] = 0.5;
        let mut detector =
            PitchDetector::with_transform(&small_config(2), FixedCepstrum(cep)).unwrap();
        detector.estimate(&[0.0; 16]);

        let qs: Vec<_> = detector.candidates().iter().map(|c| c.map(|c| c.quefrency)).collect();
        assert_eq!(qs, [Some(4), Some(6)]);
    }

    #[test]
    fn equal_strength_keeps_lower_quefrency_first() {
        let mut cep = vec![0.0f32; 8];
        cep[2] = 0.5;
        cep[5] = 0.5;
        let mut detector =
            PitchDetector::with_transform(&small_config(2), FixedCepstrum(cep)).unwrap();
        let pitches = detector.estimate(&[0.0; 16]).to_vec();
        assert_eq!(detector.candidates()[0].map(|c| c.quefrency), Some(2));
        assert_eq!(pitches, [128.0, 256.0 / 5.0]);
    }

    #[test]
    fn last_bin_cannot_be_a_peak() {
        let mut cep = vec![0.0f32; 8];
        cep[7] = 1.0;
        let mut detector =
            PitchDetector::with_transform(&small_config(1), FixedCepstrum(cep)).unwrap();
        assert_eq!(detector.estimate(&[0.0; 16]), &[0.0]);
    }

    #[test]
    fn scan_starts_at_max_pitch_bound() {
        let mut cep = vec![0.0f32; 8];
        cep[2] = 1.0;
        cep[5] = 0.5;
        // ceil(256 / 60) = 5: quefrency 2 (128 Hz) is above max_pitch.
        let config = AnalyserConfig {
            max_pitch: 60.0,
            ..small_config(2)
        };
        let mut detector = PitchDetector::with_transform(&config, FixedCepstrum(cep)).unwrap();
        let pitches = detector.estimate(&[0.0; 16]).to_vec();
        assert_eq!(pitches, [256.0 / 5.0, 0.0]);
    }

    #[test]
    fn constant_peak_weight_stabilises() {
        let config = AnalyserConfig::default();
        let window = config.pitch_window();
        let mut detector = PitchDetector::new(&config).unwrap();
        let spectrum = harmonic_spectrum(1024, 16);

        for _ in 0..window {
            detector.estimate(&spectrum);
        }
        let full = detector.weight(64);
        assert!((full - window as f32).abs() < 1e-4);

        for _ in 0..window * 3 {
            detector.estimate(&spectrum);
        }
        assert!((detector.weight(64) - full).abs() < 1e-4);
        assert!((detector.pitches()[0] - 44100.0 / 64.0).abs() < 1e-3);
    }

    #[test]
    fn silence_drains_histogram() {
        let config = AnalyserConfig::default();
        let mut detector = PitchDetector::new(&config).unwrap();
        let spectrum = harmonic_spectrum(1024, 16);
        for _ in 0..5 {
            detector.estimate(&spectrum);
        }
        assert!(detector.pitches()[0] > 0.0);

        let silence = vec![0.0f32; 1024];
        for _ in 0..config.pitch_window() {
            detector.estimate(&silence);
        }
        assert!(detector.histogram().iter().all(|&w| w == 0.0));
        assert!(detector.pitches().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn votes_expire_after_one_window() {
        let mut cep = vec![0.0f32; 8];
        cep[3] = 1.0;
        let config = small_config(1);
        let window = config.pitch_window();
        assert_eq!(window, 4);

        let mut detector = PitchDetector::with_transform(&config, FixedCepstrum(cep)).unwrap();
        for block in 1..=window * 2 {
            detector.estimate(&[0.0; 16]);
            let expected = block.min(window) as f32;
            assert!((detector.weight(3) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn ranking_prefers_heavier_bins() {
        let config = small_config(2);
        let mut a = vec![0.0f32; 8];
        a[2] = 1.0;
        a[5] = 0.5;
        let mut detector = PitchDetector::with_transform(&config, FixedCepstrum(a)).unwrap();
        detector.estimate(&[0.0; 16]);
        // Rank 0 weighs 1, rank 1 weighs 1/2.
        assert!((detector.weight(2) - 1.0).abs() < 1e-6);
        assert!((detector.weight(5) - 0.5).abs() < 1e-6);
        assert_eq!(detector.pitches(), &[128.0, 256.0 / 5.0]);
    }

    #[test]
    fn zero_pitches_is_inert() {
        let config = AnalyserConfig {
            pitch_count: 0,
            ..AnalyserConfig::default()
        };
        let mut detector = PitchDetector::new(&config).unwrap();
        assert!(detector.estimate(&harmonic_spectrum(1024, 16)).is_empty());
        assert!(detector.histogram().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let config = AnalyserConfig::default();
        let mut a = PitchDetector::new(&config).unwrap();
        let mut b = PitchDetector::new(&config).unwrap();
        for period in [16usize, 8, 32, 16, 4, 16] {
            let spectrum = harmonic_spectrum(1024, period);
            assert_eq!(a.estimate(&spectrum), b.estimate(&spectrum));
        }
    }
}
