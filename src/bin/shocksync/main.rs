//! shocksync - play an audio file with timed stimulus cues
//!
//! Run with: cargo run -- path/to/track.mp3

mod app;
mod cli;
mod logging;
mod ui;

use clap::Parser;

use cli::Cli;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Before parsing so clap's env fallbacks can see .env values.
    // The explicit file goes first so it beats the default locations.
    if let Some(path) = cli::env_file_arg(std::env::args_os()) {
        shock_sync::config::load_env_file(&path)?;
    }
    shock_sync::config::load_env_files();
    let cli = Cli::parse();

    let _log_guard = logging::init(cli.headless)?;

    let outcome = app::run(cli)?;
    tracing::info!(?outcome, "exiting");
    Ok(())
}
