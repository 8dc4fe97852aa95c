use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};

use crate::error::AudioError;

/// Seconds of audio the capture ring can hold before the producer drops samples.
const RING_SECONDS: usize = 2;

/// Microphone capture via cpal.
///
/// The device callback downmixes to mono and pushes into a lock-free ring;
/// the analysis side drains it with [`MicCapture::drain_into`].
///
/// # Example
/// ```no_run
/// use sc_audio::capture::MicCapture;
/// let mut capture = MicCapture::start_default().unwrap();
/// let mut block = Vec::new();
/// capture.drain_into(&mut block);
/// ```
pub struct MicCapture {
    /// Kept alive for the duration of the capture.
    _stream: cpal::Stream,
    consumer: Consumer<f32>,
    sample_rate: u32,
    channels: usize,
}

impl MicCapture {
    /// Start capturing from the default input device.
    ///
    /// # Errors
    /// Returns an error if no input device exists or the stream cannot start.
    pub fn start_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;

        let config = device.default_input_config()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(
                AudioError::UnsupportedFormat(format!("{:?}", config.sample_format())).into(),
            );
        }
        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels());

        let (mut producer, consumer) = RingBuffer::new(sample_rate as usize * RING_SECONDS);

        let stream = device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    let mono = frame.iter().sum::<f32>() / frame.len() as f32;
                    // Ring full: the analysis side is behind, drop the sample.
                    let _ = producer.push(mono);
                }
            },
            |err| {
                log::error!("{}", AudioError::StreamError(err.to_string()));
            },
            None,
        )?;
        stream.play()?;

        log::info!("Capture started @ {sample_rate}Hz, {channels} channel(s)");

        Ok(Self {
            _stream: stream,
            consumer,
            sample_rate,
            channels,
        })
    }

    /// Move every pending sample into `out` (cleared first).
    ///
    /// Returns how many samples were read.
    pub fn drain_into(&mut self, out: &mut Vec<f32>) -> usize {
        out.clear();
        out.reserve(self.consumer.slots());
        while let Ok(sample) = self.consumer.pop() {
            out.push(sample);
        }
        out.len()
    }

    /// Sample rate of the capture stream.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the device before downmix.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }
}
