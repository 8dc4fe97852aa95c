use serde::Serialize;

/// Features extracted from one spectrum block.
///
/// Pre-allocated by the analyser and overwritten in place every block.
///
/// # Example
/// ```
/// use sc_core::frame::AnalysisFrame;
/// let frame = AnalysisFrame::new(16, 4);
/// assert_eq!(frame.beats.len(), 16);
/// assert_eq!(frame.pitches.len(), 4);
/// assert_eq!(frame.volume, 0.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisFrame {
    /// Whole-spectrum energy, `sqrt(Σ a²) / N`, in [0, 1].
    pub volume: f32,
    /// Per-band energy when it beats the adaptive threshold, else 0.
    pub beats: Vec<f32>,
    /// Dominant pitches in Hz, strongest first. 0 = no detection.
    pub pitches: Vec<f32>,
}

impl AnalysisFrame {
    /// Zeroed frame sized for `band_count` bands and `pitch_count` pitches.
    #[must_use]
    pub fn new(band_count: usize, pitch_count: usize) -> Self {
        Self {
            volume: 0.0,
            beats: vec![0.0; band_count],
            pitches: vec![0.0; pitch_count],
        }
    }

    /// Reset every value to silence without reallocating.
    pub fn clear(&mut self) {
        self.volume = 0.0;
        self.beats.fill(0.0);
        self.pitches.fill(0.0);
    }

    /// Flatten the frame into `(key, value)` pairs under `prefix`.
    ///
    /// Keys follow the uniform naming bound by the rendering layer:
    /// `volume`, `beats[i]`, `pitches[i]`.
    ///
    /// # Example
    /// ```
    /// use sc_core::frame::AnalysisFrame;
    /// let frame = AnalysisFrame::new(1, 1);
    /// let keys: Vec<String> = frame.uniforms("mic_").into_iter().map(|(k, _)| k).collect();
    /// assert_eq!(keys, ["mic_volume", "mic_beats[0]", "mic_pitches[0]"]);
    /// ```
    #[must_use]
    pub fn uniforms(&self, prefix: &str) -> Vec<(String, f32)> {
        let mut out = Vec::with_capacity(1 + self.beats.len() + self.pitches.len());
        out.push((format!("{prefix}volume"), self.volume));
        for (i, &b) in self.beats.iter().enumerate() {
            out.push((format!("{prefix}beats[{i}]"), b));
        }
        for (i, &p) in self.pitches.iter().enumerate() {
            out.push((format!("{prefix}pitches[{i}]"), p));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_keeps_lengths() {
        let mut frame = AnalysisFrame::new(3, 2);
        frame.volume = 0.5;
        frame.beats[1] = 0.2;
        frame.pitches[0] = 440.0;
        frame.clear();
        assert_eq!(frame, AnalysisFrame::new(3, 2));
    }

    #[test]
    fn uniforms_without_prefix() {
        let mut frame = AnalysisFrame::new(2, 1);
        frame.beats[1] = 0.25;
        frame.pitches[0] = 689.0625;
        let u = frame.uniforms("");
        assert_eq!(u.len(), 4);
        assert_eq!(u[2], ("beats[1]".to_string(), 0.25));
        assert_eq!(u[3], ("pitches[0]".to_string(), 689.0625));
    }

    #[test]
    fn serializes_as_flat_record() {
        let frame = AnalysisFrame::new(0, 0);
        let value = toml::Value::try_from(&frame).unwrap();
        assert!(value.get("volume").is_some());
        assert!(value.get("beats").is_some());
    }
}
