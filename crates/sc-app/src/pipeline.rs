use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sc_audio::analyser::Analyser;
use sc_audio::capture::MicCapture;
use sc_audio::decode;
use sc_audio::spectrum::{SampleWindow, SpectrumPipeline};
use sc_core::config::AnalyserConfig;
use sc_core::frame::AnalysisFrame;
use serde::Serialize;
use triple_buffer::TripleBuffer;

use crate::cli::OutputFormat;

/// Where samples come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioInput {
    /// Default input device.
    Mic,
    /// Decoded audio file, analysed offline.
    File(PathBuf),
}

impl AudioInput {
    /// `"mic"` selects the microphone; anything else is a file path.
    #[must_use]
    pub fn parse(arg: &str) -> Self {
        if arg.eq_ignore_ascii_case("mic") {
            Self::Mic
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// One output line.
#[derive(Serialize)]
struct BlockRecord<'a> {
    block: u64,
    /// Seconds from the start of the signal to the end of the block.
    time: f64,
    #[serde(flatten)]
    frame: &'a AnalysisFrame,
}

/// Write one block in the selected format.
fn write_frame(
    out: &mut impl Write,
    format: OutputFormat,
    prefix: &str,
    block: u64,
    time: f64,
    frame: &AnalysisFrame,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &BlockRecord { block, time, frame })?;
        }
        OutputFormat::Uniforms => {
            write!(out, "block={block} time={time:.3}")?;
            for (key, value) in frame.uniforms(prefix) {
                write!(out, " {key}={value}")?;
            }
        }
    }
    writeln!(out)?;
    Ok(())
}

/// Decode `path` and analyse it offline, one block every N samples.
///
/// The configured sample rate is replaced by the file's native rate.
/// Returns the number of blocks written.
///
/// # Errors
/// Returns an error if decoding fails, the configuration is invalid, or
/// writing to `out` fails.
pub fn run_file(
    path: &Path,
    mut config: AnalyserConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<u64> {
    let audio = decode::decode_file(path)?;
    if audio.samples.is_empty() {
        anyhow::bail!("Audio file is empty: {}", path.display());
    }
    config.sample_rate = audio.sample_rate;
    log::info!(
        "Analysing {:.1}s of audio from {}",
        audio.duration_secs(),
        path.display()
    );
    analyse_samples(&audio.samples, config, format, out)
}

/// Run the whole pipeline over an in-memory signal.
///
/// # Errors
/// Returns an error if the configuration is invalid or writing fails.
pub fn analyse_samples(
    samples: &[f32],
    config: AnalyserConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<u64> {
    let n = config.block_size;
    let sample_rate = f64::from(config.sample_rate);
    let mut analyser = Analyser::new(config).context("Cannot build analyser")?;
    let prefix = analyser.prefix().to_string();
    let mut pipeline = SpectrumPipeline::new(n);
    let mut window = SampleWindow::new(pipeline.fft_size(), n);

    let mut blocks = 0u64;
    for chunk in samples.chunks(n) {
        window.push(chunk);
        if let Some(block) = window.next_block() {
            analyser.load_waveform(block);
            let frame = analyser.process(pipeline.process(block));
            blocks += 1;
            let time = (blocks * n as u64) as f64 / sample_rate;
            write_frame(out, format, &prefix, blocks - 1, time, frame)?;
        }
    }
    Ok(blocks)
}

/// Spawn the capture + analysis thread.
///
/// The thread owns the device stream and the analyser, and publishes each
/// frame into a triple buffer. Returns the reading end once the device is
/// running, along with the capture sample rate.
///
/// # Errors
/// Returns an error if the device or the analyser fails to initialise.
pub fn spawn_capture_thread(
    mut config: AnalyserConfig,
    stop: Arc<AtomicBool>,
) -> Result<(
    triple_buffer::Output<AnalysisFrame>,
    u32,
    thread::JoinHandle<()>,
)> {
    let initial = AnalysisFrame::new(config.band_count, config.pitch_count);
    let (mut buf_input, buf_output) = TripleBuffer::new(&initial).split();
    let (ready_tx, ready_rx) = flume::bounded::<Result<u32>>(1);

    let handle = thread::Builder::new()
        .name("sc-capture".to_string())
        .spawn(move || {
            let setup = MicCapture::start_default().and_then(|capture| {
                config.sample_rate = capture.sample_rate();
                let analyser = Analyser::new(config)?;
                Ok((capture, analyser))
            });
            let (mut capture, mut analyser) = match setup {
                Ok(parts) => parts,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(capture.sample_rate()));
            run_capture_loop(&mut capture, &mut analyser, &mut buf_input, &stop);
        })?;

    let sample_rate = ready_rx
        .recv()
        .context("Capture thread exited during setup")??;
    Ok((buf_output, sample_rate, handle))
}

/// Drain the device, analyse every completed hop, publish the latest frame.
fn run_capture_loop(
    capture: &mut MicCapture,
    analyser: &mut Analyser,
    buf_input: &mut triple_buffer::Input<AnalysisFrame>,
    stop: &AtomicBool,
) {
    let n = analyser.config().block_size;
    let block_period =
        Duration::from_secs_f64(n as f64 / f64::from(analyser.config().sample_rate) / 2.0);
    let mut pipeline = SpectrumPipeline::new(n);
    let mut window = SampleWindow::new(pipeline.fft_size(), n);
    let mut chunk: Vec<f32> = Vec::with_capacity(n * 4);

    while !stop.load(Ordering::Relaxed) {
        capture.drain_into(&mut chunk);
        // One hop at a time so a late wake-up still analyses every block.
        for hop in chunk.chunks(n) {
            window.push(hop);
            if let Some(block) = window.next_block() {
                analyser.load_waveform(block);
                let frame = analyser.process(pipeline.process(block));
                buf_input.write(frame.clone());
            }
        }
        thread::sleep(block_period);
    }
}

/// Namespace given to live input when the configuration leaves it unnamed.
pub const MIC_NAME: &str = "mic";

fn with_mic_name(mut config: AnalyserConfig) -> AnalyserConfig {
    if config.name.is_empty() {
        config.name = MIC_NAME.to_string();
    }
    config
}

/// Live mode: print the latest frame at `fps` until `duration` elapses.
///
/// An unnamed configuration is namespaced as [`MIC_NAME`].
///
/// # Errors
/// Returns an error if capture fails to start or writing fails.
pub fn run_mic(
    config: AnalyserConfig,
    format: OutputFormat,
    fps: u32,
    duration: Option<f64>,
    out: &mut impl Write,
) -> Result<u64> {
    let config = with_mic_name(config);
    let prefix = config.prefix();
    let stop = Arc::new(AtomicBool::new(false));
    let (mut frames, sample_rate, handle) = spawn_capture_thread(config, Arc::clone(&stop))?;
    log::info!("Live analysis @ {sample_rate}Hz, printing at {fps} fps");

    let frame_period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let deadline = duration.map(|d| Instant::now() + Duration::from_secs_f64(d.max(0.0)));
    let start = Instant::now();

    let mut printed = 0u64;
    let result = loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break Ok(printed);
        }
        thread::sleep(frame_period);
        let time = start.elapsed().as_secs_f64();
        if let Err(e) = write_frame(out, format, &prefix, printed, time, frames.read()) {
            break Err(e);
        }
        printed += 1;
    };

    stop.store(true, Ordering::Relaxed);
    if handle.join().is_err() {
        log::error!("Capture thread panicked");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn input_parsing() {
        assert_eq!(AudioInput::parse("mic"), AudioInput::Mic);
        assert_eq!(AudioInput::parse("MIC"), AudioInput::Mic);
        assert_eq!(
            AudioInput::parse("song.flac"),
            AudioInput::File(PathBuf::from("song.flac"))
        );
    }

    #[test]
    fn one_json_line_per_block() {
        let config = AnalyserConfig::default();
        let samples = sine(440.0, 44100, 1024 * 10);
        let mut out = Vec::new();
        let blocks = analyse_samples(&samples, config, OutputFormat::Json, &mut out).unwrap();
        assert_eq!(blocks, 10);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        let record: serde_json::Value = serde_json::from_str(lines[9]).unwrap();
        assert_eq!(record["block"], 9);
        assert_eq!(record["beats"].as_array().map(Vec::len), Some(16));
        assert_eq!(record["pitches"].as_array().map(Vec::len), Some(4));
        assert!(record["volume"].as_f64().is_some_and(|v| v > 0.0));
    }

    #[test]
    fn uniform_lines_carry_namespace() {
        let config = AnalyserConfig {
            name: "mic".into(),
            band_count: 1,
            pitch_count: 1,
            ..AnalyserConfig::default()
        };
        let samples = sine(440.0, 44100, 1024);
        let mut out = Vec::new();
        analyse_samples(&samples, config, OutputFormat::Uniforms, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("block=0 time=0.023 mic_volume="));
        assert!(text.contains(" mic_beats[0]="));
        assert!(text.contains(" mic_pitches[0]="));
    }

    #[test]
    fn short_signal_yields_no_block() {
        let mut out = Vec::new();
        let blocks = analyse_samples(
            &[0.0; 100],
            AnalyserConfig::default(),
            OutputFormat::Json,
            &mut out,
        )
        .unwrap();
        assert_eq!(blocks, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_config_is_reported() {
        let config = AnalyserConfig {
            block_size: 3,
            ..AnalyserConfig::default()
        };
        let mut out = Vec::new();
        assert!(analyse_samples(&[0.0; 4096], config, OutputFormat::Json, &mut out).is_err());
    }

    #[test]
    fn live_input_defaults_to_mic_namespace() {
        let config = with_mic_name(AnalyserConfig::default());
        assert_eq!(config.prefix(), "mic_");

        let named = AnalyserConfig {
            name: "room".into(),
            ..AnalyserConfig::default()
        };
        assert_eq!(with_mic_name(named).prefix(), "room_");
    }
}
