//! waveterm - a terminal music player.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod cli;
pub mod config;
pub mod cover;
pub mod error;
pub mod model;
pub mod player;
pub mod tui;

use cli::Cli;
use model::{RepeatMode, Song};
use player::AudioEngine;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("waveterm=info".parse().unwrap()))
        .init();

    let mut settings = config::load();
    if cli.volume != 1.0 {
        settings.audio.volume = cli.volume;
    }

    let files = cli.resolve_playlist();
    if files.is_empty() {
        anyhow::bail!("no playable files given (see --help for accepted extensions)");
    }

    let songs: Vec<Song> = files.into_iter().map(Song::from_path).collect();

    let engine = AudioEngine::new(songs)?;

    if let Some(name) = &cli.mixer {
        tracing::info!("mixer backend '{}' requested; using default output device", name);
    }

    let _ = engine.control().set_volume(settings.audio.volume);

    let target_repeat = RepeatMode::parse(&settings.audio.default_repeat_mode);
    while engine.control().get_repeat_mode() != target_repeat {
        let _ = engine.control().cycle_repeat(true);
    }

    let _ = engine.control().play(0);

    tui::run(engine, !cli.no_image)?;

    Ok(())
}
