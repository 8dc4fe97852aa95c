use anyhow::Result;
use clap::Parser;

pub mod cli;
pub mod pipeline;

use pipeline::AudioInput;

fn main() -> Result<()> {
    // 1. Parse CLI
    let cli = cli::Cli::parse();

    // 2. Initialise logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Load config, then apply CLI overrides
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config);

    // 4. Run the selected source
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let blocks = match AudioInput::parse(&cli.audio) {
        AudioInput::Mic => pipeline::run_mic(config, cli.format, cli.fps, cli.duration, &mut out)?,
        AudioInput::File(path) => pipeline::run_file(&path, config, cli.format, &mut out)?,
    };

    log::info!("{blocks} frame(s) written");
    Ok(())
}

/// Load `--config` if it exists, else fall back to defaults.
fn resolve_config(cli: &cli::Cli) -> Result<sc_core::config::AnalyserConfig> {
    if cli.config.exists() {
        sc_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config not found: {}. Using defaults.",
            cli.config.display()
        );
        Ok(sc_core::config::AnalyserConfig::default())
    }
}
