use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sc_core::config::AnalyserConfig;

/// spectracue: beats and pitches from a live or recorded spectrum.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Audio source: "mic" for the default input device, or a path to an audio file.
    #[arg(long)]
    pub audio: String,

    /// TOML configuration file. Default: config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Namespace for output keys (overrides the config).
    #[arg(long)]
    pub name: Option<String>,

    /// Number of beat bands, 0 to disable (overrides the config).
    #[arg(long)]
    pub beats: Option<usize>,

    /// Number of pitches, 0 to disable (overrides the config).
    #[arg(long)]
    pub pitches: Option<usize>,

    /// Frames printed per second in mic mode.
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Stop mic mode after this many seconds. Runs until killed otherwise.
    #[arg(long)]
    pub duration: Option<f64>,

    /// Output format, one line per block.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Line format written to stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per block.
    Json,
    /// `key=value` pairs using the namespaced uniform names.
    Uniforms,
}

impl Cli {
    /// Apply the command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut AnalyserConfig) {
        if let Some(ref name) = self.name {
            config.name.clone_from(name);
        }
        if let Some(beats) = self.beats {
            config.band_count = beats;
        }
        if let Some(pitches) = self.pitches {
            config.pitch_count = pitches;
        }
    }
}
