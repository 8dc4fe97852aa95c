use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

/// A fully decoded mono signal.
#[derive(Clone, Debug, Default)]
pub struct DecodedAudio {
    /// Mono samples in [-1, 1].
    pub samples: Vec<f32>,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode an audio file into mono f32 samples at its native rate.
///
/// Supports WAV, MP3, FLAC, OGG, AAC via symphonia.
///
/// # Errors
/// Returns an error if the file cannot be opened, probed, or has no audio track.
///
/// # Example
/// ```no_run
/// use sc_audio::decode::decode_file;
/// let audio = decode_file("track.wav").unwrap();
/// println!("{} samples @ {}Hz", audio.samples.len(), audio.sample_rate);
/// ```
pub fn decode_file(path: impl AsRef<Path>) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Cannot open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::DecodeError("no default audio track".into()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::DecodeError("track has no sample rate".into()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Packet read error, stopping decode: {e}");
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping corrupt frame: {e}");
                continue;
            }
            Err(e) => return Err(AudioError::DecodeError(e.to_string()).into()),
        };

        let spec = *decoded.spec();
        let frames = decoded.capacity() as u64;
        let needed = frames as usize * spec.channels.count();
        // Reallocate only when a packet outgrows the current buffer.
        if sample_buf.as_ref().is_none_or(|b| b.capacity() < needed) {
            sample_buf = Some(SampleBuffer::<f32>::new(frames, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        downmix_into(buf.samples(), spec.channels.count(), &mut samples);
    }

    log::info!(
        "Decoded {} samples @ {}Hz from {}",
        samples.len(),
        sample_rate,
        path.display()
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Average interleaved frames of `channels` samples into `out`.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    let channels = channels.max(1);
    out.reserve(interleaved.len() / channels);
    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
    );
}
