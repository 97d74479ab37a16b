// wordvoice - pronunciation audio for vocabulary drills
// Module declarations
pub mod audio;
pub mod cache;
pub mod cancel;
pub mod cli;
pub mod commands;
pub mod db;
pub mod debug_log;
pub mod error;
pub mod logging;
pub mod network;
pub mod preload;
pub mod resolver;
pub mod settings;
pub mod state;
pub mod vocabulary;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use settings::AppSettings;

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = match cli.data_dir.clone().or_else(cli::default_data_dir) {
        Some(dir) => dir,
        None => anyhow::bail!("No data directory available, pass --data-dir"),
    };

    // Held until exit so buffered log lines are flushed
    let _log_guard = logging::init(&data_dir);

    let mut settings = AppSettings::load(&data_dir)?;
    if let Some(locale) = cli.locale {
        settings.language.locale = locale;
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(cli::execute(cli.command, &data_dir, settings))
}
