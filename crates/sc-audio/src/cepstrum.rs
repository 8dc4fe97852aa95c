use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
pub use sc_core::traits::CepstrumTransform;

/// Default cepstrum transform: amplitude spectrum of a real FFT.
///
/// For an input of length N, writes `2·|X[k]| / N` for `k` in `0..N/2`.
/// Pre-allocates the plan and scratch buffers for a zero-allocation hot path.
///
/// # Example
/// ```
/// use sc_audio::cepstrum::{CepstrumTransform, RealFftCepstrum};
///
/// let mut transform = RealFftCepstrum::new(8);
/// // One full cosine period over 8 samples lands in bin 1.
/// let input: Vec<f32> = (0..8)
///     .map(|i| (2.0 * std::f32::consts::PI * i as f32 / 8.0).cos())
///     .collect();
/// let mut output = [0.0f32; 4];
/// transform.transform(&input, &mut output);
/// assert!((output[1] - 1.0).abs() < 1e-5);
/// assert!(output[2].abs() < 1e-5);
/// ```
pub struct RealFftCepstrum {
    size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    plan: Arc<dyn RealToComplex<f32>>,
}

impl RealFftCepstrum {
    /// Plan a transform for inputs of `size` samples.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "transform size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        Self {
            size,
            input_buf: plan.make_input_vec(),
            spectrum_buf: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
        }
    }

    /// Input length N.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl CepstrumTransform for RealFftCepstrum {
    fn transform(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.size, "transform input length");
        debug_assert_eq!(output.len(), self.size / 2, "transform output length");

        // realfft uses its input as scratch space, so work on a copy.
        let n = self.size.min(input.len());
        self.input_buf[..n].copy_from_slice(&input[..n]);
        self.input_buf[n..].fill(0.0);

        if let Err(e) = self.plan.process_with_scratch(
            &mut self.input_buf,
            &mut self.spectrum_buf,
            &mut self.scratch,
        ) {
            log::warn!("Cepstrum transform failed: {e}");
            output.fill(0.0);
            return;
        }

        let scale = 2.0 / self.size as f32;
        for (out, c) in output.iter_mut().zip(&self.spectrum_buf) {
            *out = c.norm() * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_map_to_zeros() {
        let mut transform = RealFftCepstrum::new(64);
        let mut out = vec![1.0f32; 32];
        transform.transform(&[0.0; 64], &mut out);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn periodic_input_peaks_at_repetition_count() {
        let n = 256;
        let period = 16;
        let input: Vec<f32> = (0..n)
            .map(|k| (2.0 * std::f32::consts::PI * (k % period) as f32 / period as f32).cos())
            .collect();
        let mut transform = RealFftCepstrum::new(n);
        let mut out = vec![0.0f32; n / 2];
        transform.transform(&input, &mut out);

        let peak = out[1..]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i + 1);
        assert_eq!(peak, Some(n / period));
    }

    #[test]
    fn input_is_left_untouched() {
        let input: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let copy = input.clone();
        let mut transform = RealFftCepstrum::new(16);
        let mut out = [0.0f32; 8];
        transform.transform(&input, &mut out);
        assert_eq!(input, copy);
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let input: Vec<f32> = (0..32).map(|i| ((i * 7) % 5) as f32 * 0.1).collect();
        let mut transform = RealFftCepstrum::new(32);
        let mut a = [0.0f32; 16];
        let mut b = [0.0f32; 16];
        transform.transform(&input, &mut a);
        transform.transform(&input, &mut b);
        assert_eq!(a, b);
    }
}
