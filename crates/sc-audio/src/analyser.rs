use sc_core::config::AnalyserConfig;
use sc_core::error::CoreError;
use sc_core::frame::AnalysisFrame;

use crate::beat::BeatDetector;
use crate::cepstrum::{CepstrumTransform, RealFftCepstrum};
use crate::pitch::PitchDetector;

/// One namespaced analysis instance: a beat detector and a pitch detector
/// fed from the same spectrum, publishing into a reusable [`AnalysisFrame`].
///
/// Instances share nothing; several may run side by side (one per input).
///
/// # Example
/// ```
/// use sc_audio::analyser::Analyser;
/// use sc_core::config::AnalyserConfig;
///
/// let config = AnalyserConfig { name: "mic".into(), ..AnalyserConfig::default() };
/// let mut analyser = Analyser::new(config).unwrap();
/// let frame = analyser.process(&vec![0.0f32; 1024]);
/// assert_eq!(frame.beats.len(), 16);
/// assert_eq!(frame.pitches, vec![0.0; 4]);
/// assert_eq!(analyser.prefix(), "mic_");
/// ```
pub struct Analyser<T = RealFftCepstrum> {
    config: AnalyserConfig,
    prefix: String,
    beat: BeatDetector,
    pitch: PitchDetector<T>,
    frame: AnalysisFrame,
    /// Last analysed spectrum, N levels in [0, 1].
    freq: Vec<f32>,
    /// Newest N samples of the waveform fed alongside the spectrum.
    time: Vec<f32>,
}

impl Analyser<RealFftCepstrum> {
    /// Create an analyser using the realfft-backed cepstrum transform.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub fn new(config: AnalyserConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let transform = RealFftCepstrum::new(config.block_size);
        Ok(Self::build(config, transform))
    }
}

impl<T: CepstrumTransform> Analyser<T> {
    /// Create an analyser around a caller-supplied cepstrum transform.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub fn with_transform(config: AnalyserConfig, transform: T) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::build(config, transform))
    }

    fn build(config: AnalyserConfig, transform: T) -> Self {
        let beat = BeatDetector::build(&config);
        let pitch = PitchDetector::build(&config, transform);
        log::debug!(
            "Analyser '{}': N={} @ {}Hz, {} bands, {} pitches",
            config.name,
            config.block_size,
            config.sample_rate,
            config.band_count,
            config.pitch_count
        );
        Self {
            prefix: config.prefix(),
            frame: AnalysisFrame::new(config.band_count, config.pitch_count),
            freq: vec![0.0; config.block_size],
            time: vec![0.0; config.block_size],
            beat,
            pitch,
            config,
        }
    }

    /// Analyse one normalised spectrum block (values in [0, 1]).
    ///
    /// # Panics
    /// Panics if `spectrum.len()` differs from the configured block size.
    pub fn process(&mut self, spectrum: &[f32]) -> &AnalysisFrame {
        assert_eq!(
            spectrum.len(),
            self.config.block_size,
            "spectrum length must equal the configured block size"
        );
        self.freq.copy_from_slice(spectrum);
        run_stages(&mut self.beat, &mut self.pitch, &mut self.frame, &self.freq);
        &self.frame
    }

    /// Checked variant of [`Analyser::process`].
    ///
    /// # Errors
    /// Returns [`CoreError::SpectrumLength`] instead of panicking on a
    /// spectrum of the wrong length.
    pub fn try_process(&mut self, spectrum: &[f32]) -> Result<&AnalysisFrame, CoreError> {
        if spectrum.len() != self.config.block_size {
            return Err(CoreError::SpectrumLength {
                expected: self.config.block_size,
                actual: spectrum.len(),
            });
        }
        Ok(self.process(spectrum))
    }

    /// Analyse an 8-bit analyser spectrum (0..=255 mapped to [0, 1]).
    ///
    /// # Panics
    /// Panics if `bytes.len()` differs from the configured block size.
    ///
    /// # Example
    /// ```
    /// use sc_audio::analyser::Analyser;
    /// use sc_core::config::AnalyserConfig;
    ///
    /// let mut analyser = Analyser::new(AnalyserConfig::default()).unwrap();
    /// let frame = analyser.process_bytes(&[255u8; 1024]);
    /// assert!((frame.volume - 1.0 / 32.0).abs() < 1e-6); // sqrt(1024) / 1024
    /// ```
    pub fn process_bytes(&mut self, bytes: &[u8]) -> &AnalysisFrame {
        assert_eq!(
            bytes.len(),
            self.config.block_size,
            "spectrum length must equal the configured block size"
        );
        for (dst, &b) in self.freq.iter_mut().zip(bytes) {
            *dst = f32::from(b) / 255.0;
        }
        run_stages(&mut self.beat, &mut self.pitch, &mut self.frame, &self.freq);
        &self.frame
    }

    /// Keep the newest N samples of `samples` as the current waveform.
    ///
    /// Shorter input is right-aligned and zero-padded at the front.
    ///
    /// # Example
    /// ```
    /// use sc_audio::analyser::Analyser;
    /// use sc_core::config::AnalyserConfig;
    ///
    /// let config = AnalyserConfig { block_size: 4, band_count: 0, ..AnalyserConfig::default() };
    /// let mut analyser = Analyser::new(config).unwrap();
    /// analyser.load_waveform(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    /// assert_eq!(analyser.time(), &[0.3, 0.4, 0.5, 0.6]);
    /// ```
    pub fn load_waveform(&mut self, samples: &[f32]) {
        let n = self.time.len();
        if samples.len() >= n {
            self.time.copy_from_slice(&samples[samples.len() - n..]);
        } else {
            let start = n - samples.len();
            self.time[..start].fill(0.0);
            self.time[start..].copy_from_slice(samples);
        }
    }

    /// Output of the last processed block.
    #[must_use]
    pub fn frame(&self) -> &AnalysisFrame {
        &self.frame
    }

    /// Last frame flattened under this analyser's key prefix.
    #[must_use]
    pub fn uniforms(&self) -> Vec<(String, f32)> {
        let mut out = self.frame.uniforms(&self.prefix);
        out.push((format!("{}sampleCount", self.prefix), self.sample_count() as f32));
        out
    }

    /// Spectrum length N shared by `freq` and `time`.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.config.block_size
    }

    /// Spectrum of the last processed block.
    #[must_use]
    pub fn freq(&self) -> &[f32] {
        &self.freq
    }

    /// Waveform last passed to [`Analyser::load_waveform`].
    #[must_use]
    pub fn time(&self) -> &[f32] {
        &self.time
    }

    /// Cepstrum of the last block (all zeros while pitch detection is disabled).
    #[must_use]
    pub fn cepstrum(&self) -> &[f32] {
        self.pitch.cepstrum()
    }

    /// Output key prefix, `"<name>_"` or empty.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Configuration this analyser was built from.
    #[must_use]
    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }
}

/// Run both estimators on `spectrum` and publish into `frame`.
///
/// Volume is always computed; each stage is skipped when its count is 0.
fn run_stages<T: CepstrumTransform>(
    beat: &mut BeatDetector,
    pitch: &mut PitchDetector<T>,
    frame: &mut AnalysisFrame,
    spectrum: &[f32],
) {
    let (volume, beats) = beat.estimate(spectrum);
    frame.volume = volume;
    frame.beats.copy_from_slice(beats);

    if !frame.pitches.is_empty() {
        frame.pitches.copy_from_slice(pitch.estimate(spectrum));
    }
}
