/// Length-halving real transform turning a log spectrum into a cepstrum.
///
/// Implementations must be deterministic: identical input yields identical
/// output. `&mut self` only grants access to pre-allocated scratch buffers.
///
/// # Example
/// ```
/// use sc_core::traits::CepstrumTransform;
///
/// struct Decimate;
/// impl CepstrumTransform for Decimate {
///     fn transform(&mut self, input: &[f32], output: &mut [f32]) {
///         for (o, pair) in output.iter_mut().zip(input.chunks_exact(2)) {
///             *o = pair[0];
///         }
///     }
/// }
///
/// let mut out = [0.0; 2];
/// Decimate.transform(&[1.0, 0.0, 2.0, 0.0], &mut out);
/// assert_eq!(out, [1.0, 2.0]);
/// ```
pub trait CepstrumTransform: Send {
    /// Transform `input` (length N) into `output` (length N/2).
    ///
    /// CONTRACT: must not allocate; `output` is pre-allocated by the caller.
    fn transform(&mut self, input: &[f32], output: &mut [f32]);
}

impl<T: CepstrumTransform + ?Sized> CepstrumTransform for Box<T> {
    fn transform(&mut self, input: &[f32], output: &mut [f32]) {
        (**self).transform(input, output);
    }
}
