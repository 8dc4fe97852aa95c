use realfft::RealFftPlanner;

/// Lower bound of the dB range mapped to 0.
pub const DEFAULT_MIN_DB: f32 = -100.0;
/// Upper bound of the dB range mapped to 1.
pub const DEFAULT_MAX_DB: f32 = -30.0;
/// Weight of the previous block in the magnitude smoother.
pub const DEFAULT_SMOOTHING: f32 = 0.8;

/// Spectrum pipeline: windowed real FFT producing normalised bin levels.
///
/// Mirrors a browser analyser node: `2N` samples in, `N` bins out. Magnitudes
/// are smoothed across blocks, converted to dB and mapped from
/// `[min_db, max_db]` onto `[0, 1]`.
///
/// Pre-allocates the FFT plan and every buffer for a zero-allocation hot path.
///
/// # Example
/// ```
/// use sc_audio::spectrum::SpectrumPipeline;
/// let mut pipeline = SpectrumPipeline::new(1024);
/// let spectrum = pipeline.process(&vec![0.0f32; 2048]);
/// assert_eq!(spectrum.len(), 1024);
/// assert!(spectrum.iter().all(|&v| v == 0.0));
/// ```
pub struct SpectrumPipeline {
    bins: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Blackman window coefficients.
    window: Vec<f32>,
    /// Smoothed linear magnitudes carried between blocks.
    smoothed: Vec<f32>,
    levels: Vec<f32>,
    min_db: f32,
    max_db: f32,
    smoothing: f32,
}

impl SpectrumPipeline {
    /// Create a pipeline producing `bins` levels from `2 · bins` samples.
    ///
    /// # Panics
    /// Panics if `bins` is 0.
    #[must_use]
    pub fn new(bins: usize) -> Self {
        assert!(bins > 0, "bin count must be > 0");
        let size = bins * 2;

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        // Blackman, alpha = 0.16
        let window: Vec<f32> = (0..size)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect();

        Self {
            bins,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
            smoothed: vec![0.0; bins],
            levels: vec![0.0; bins],
            min_db: DEFAULT_MIN_DB,
            max_db: DEFAULT_MAX_DB,
            smoothing: DEFAULT_SMOOTHING,
        }
    }

    /// Override the dB range and the smoothing constant.
    ///
    /// `max_db` is kept above `min_db`; `smoothing` is clamped to [0, 1).
    #[must_use]
    pub fn with_range(mut self, min_db: f32, max_db: f32, smoothing: f32) -> Self {
        self.min_db = min_db;
        self.max_db = max_db.max(min_db + 1.0);
        self.smoothing = smoothing.clamp(0.0, 0.99);
        self
    }

    /// Process the last `2N` samples into `N` normalised levels.
    ///
    /// Shorter input is zero-padded at the end.
    pub fn process(&mut self, samples: &[f32]) -> &[f32] {
        let n = self.input_buf.len().min(samples.len());

        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n {
                samples[i] * self.window[i]
            } else {
                0.0
            };
        }

        if let Err(e) = self.plan.process_with_scratch(
            &mut self.input_buf,
            &mut self.spectrum_buf,
            &mut self.scratch,
        ) {
            log::warn!("Spectrum FFT failed: {e}");
            self.levels.fill(0.0);
            return &self.levels;
        }

        let size = self.input_buf.len() as f32;
        let range = self.max_db - self.min_db;
        for ((c, s), level) in self
            .spectrum_buf
            .iter()
            .zip(self.smoothed.iter_mut())
            .zip(self.levels.iter_mut())
        {
            let magnitude = c.norm() / size;
            *s = self.smoothing * *s + (1.0 - self.smoothing) * magnitude;
            *level = if *s > 0.0 {
                let db = 20.0 * s.log10();
                ((db - self.min_db) / range).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }

        &self.levels
    }

    /// Number of output bins N.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Samples consumed per block, `2N`.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.input_buf.len()
    }
}

/// Sliding sample window that releases a block every `hop` fresh samples.
///
/// Keeps the most recent `len` samples; older samples are discarded.
///
/// # Example
/// ```
/// use sc_audio::spectrum::SampleWindow;
/// let mut window = SampleWindow::new(4, 2);
/// window.push(&[1.0, 2.0, 3.0]);
/// assert_eq!(window.next_block(), Some(&[0.0, 1.0, 2.0, 3.0][..]));
/// assert_eq!(window.next_block(), None);
/// ```
pub struct SampleWindow {
    buf: Vec<f32>,
    len: usize,
    hop: usize,
    /// Samples pushed since the last released block.
    fresh: usize,
}

impl SampleWindow {
    /// Create a window of `len` samples advancing by `hop`.
    ///
    /// # Panics
    /// Panics if `len` or `hop` is 0.
    #[must_use]
    pub fn new(len: usize, hop: usize) -> Self {
        assert!(len > 0 && hop > 0, "window length and hop must be > 0");
        Self {
            buf: vec![0.0; len],
            len,
            hop,
            fresh: 0,
        }
    }

    /// Append samples, keeping only the newest `len`.
    pub fn push(&mut self, samples: &[f32]) {
        if samples.len() >= self.len {
            self.buf.copy_from_slice(&samples[samples.len() - self.len..]);
        } else {
            self.buf.rotate_left(samples.len());
            let start = self.len - samples.len();
            self.buf[start..].copy_from_slice(samples);
        }
        self.fresh += samples.len();
    }

    /// Current window if a full hop of samples is still unreleased.
    ///
    /// Each call consumes one hop, so a push spanning several hops releases
    /// one block per hop. Samples pushed beyond the window length are gone;
    /// feed at most one hop at a time to analyse every block.
    pub fn next_block(&mut self) -> Option<&[f32]> {
        if self.fresh < self.hop {
            return None;
        }
        self.fresh -= self.hop;
        Some(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn levels_stay_normalised() {
        let mut pipeline = SpectrumPipeline::new(512);
        let samples = sine(1000.0, 44100.0, 1024);
        for _ in 0..10 {
            let levels = pipeline.process(&samples);
            assert!(levels.iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        // bin width = 44100 / 2048 ≈ 21.5 Hz
        let mut pipeline = SpectrumPipeline::new(1024).with_range(-100.0, 0.0, 0.0);
        let samples = sine(43.0 * 44100.0 / 2048.0, 44100.0, 2048);
        let levels = pipeline.process(&samples);
        let peak = levels
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(43));
    }

    #[test]
    fn smoothing_decays_toward_silence() {
        let mut pipeline = SpectrumPipeline::new(256);
        let loud = sine(2000.0, 44100.0, 512);
        let first = pipeline.process(&loud).iter().copied().fold(0.0f32, f32::max);
        let silent = vec![0.0f32; 512];
        let mut last = first;
        for _ in 0..5 {
            let now = pipeline.process(&silent).iter().copied().fold(0.0f32, f32::max);
            assert!(now <= last);
            last = now;
        }
        assert!(last < first);
    }

    #[test]
    fn window_releases_every_hop() {
        let mut window = SampleWindow::new(8, 4);
        let mut released = 0;
        for chunk in (0..40).map(|i| i as f32).collect::<Vec<_>>().chunks(2) {
            window.push(chunk);
            if window.next_block().is_some() {
                released += 1;
            }
        }
        assert_eq!(released, 10);
    }

    #[test]
    fn window_keeps_newest_samples() {
        let mut window = SampleWindow::new(3, 1);
        window.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(window.next_block(), Some(&[3.0, 4.0, 5.0][..]));
        window.push(&[6.0]);
        assert_eq!(window.next_block(), Some(&[4.0, 5.0, 6.0][..]));
    }

    #[test]
    fn window_releases_one_block_per_accumulated_hop() {
        let mut window = SampleWindow::new(8, 4);
        window.push(&[1.0; 13]);
        assert!(window.next_block().is_some());
        assert!(window.next_block().is_some());
        assert!(window.next_block().is_some());
        assert_eq!(window.next_block(), None);
        window.push(&[2.0; 3]);
        assert!(window.next_block().is_some());
    }
}
