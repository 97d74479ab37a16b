// Command line front end
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::audio::{AudioReference, Locale, Resolution};
use crate::cancel::CancelToken;
use crate::commands;
use crate::preload::{Phase, ProgressEvent};
use crate::settings::AppSettings;
use crate::state::AppState;
use crate::vocabulary::{read_word_list, VocabularyWord};

#[derive(Debug, Parser)]
#[command(name = "wordvoice", version, about = "Pronunciation audio for vocabulary drills")]
pub struct Cli {
    /// Directory holding settings, the audio cache and the log file
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the configured locale (en, zh-CN)
    #[arg(long, global = true, value_parser = parse_locale)]
    pub locale: Option<Locale>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve audio for every word in a word list
    Preload {
        file: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// Print the run's debug log
        #[arg(long)]
        verbose: bool,
    },
    /// Resolve a single word and report where its audio came from
    Resolve { word: String },
    /// Speak a word with the on-device voice
    Speak { word: String },
    /// Inspect or maintain the audio cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum CacheAction {
    Usage,
    Sweep,
    Clear,
}

fn parse_locale(value: &str) -> Result<Locale, String> {
    Locale::parse(value).ok_or_else(|| format!("unsupported locale '{}', expected en or zh-CN", value))
}

pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("wordvoice"))
}

/// Cancel the token on Ctrl-C
fn cancel_on_ctrl_c(cancel: &CancelToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
}

pub async fn execute(command: Command, data_dir: &Path, settings: AppSettings) -> Result<()> {
    let state = AppState::new(data_dir.to_path_buf(), settings);

    match command {
        Command::Preload { file, json, verbose } => preload(&state, &file, json, verbose).await,
        Command::Resolve { word } => resolve(&state, &word).await,
        Command::Speak { word } => {
            let cancel = CancelToken::new();
            cancel_on_ctrl_c(&cancel);
            commands::speak_word(&state, &word, &cancel)
                .await
                .with_context(|| format!("Could not speak '{}'", word))
        }
        Command::Cache { action } => cache(&state, action).await,
    }
}

async fn preload(state: &AppState, file: &Path, json: bool, verbose: bool) -> Result<()> {
    let mut words = read_word_list(file)?;
    if words.is_empty() {
        bail!("No words found in {}", file.display());
    }

    let cancel = CancelToken::new();
    cancel_on_ctrl_c(&cancel);

    let mut last_phase = None;
    let result = commands::preload_vocabulary(
        state,
        &mut words,
        |event| {
            if !json {
                print_progress(event, &mut last_phase);
            }
        },
        &cancel,
    )
    .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if verbose {
        for line in &result.debug_log {
            println!("  {}", line);
        }
    }
    println!(
        "Done in {:.1}s via {}: {}/{} words ready",
        result.duration.as_secs_f32(),
        result.method,
        result.successful_words,
        result.total_words
    );
    if !result.failed_words.is_empty() {
        println!("No audio for: {}", result.failed_words.join(", "));
    }
    if cancel.is_cancelled() {
        warn!("Preload was cancelled");
    }
    Ok(())
}

fn print_progress(event: &ProgressEvent, last_phase: &mut Option<Phase>) {
    if *last_phase != Some(event.phase) {
        println!("== {}", event.phase);
        *last_phase = Some(event.phase);
    }
    if let Some(word) = &event.current_word {
        let eta = event.estimated_remaining.as_secs();
        println!(
            "[{:>3.0}%] {}/{} {} (ok {}, failed {}{})",
            event.percentage,
            event.current,
            event.total,
            word,
            event.success_count,
            event.error_count,
            if eta > 0 { format!(", ~{}s left", eta) } else { String::new() }
        );
    }
}

async fn resolve(state: &AppState, word: &str) -> Result<()> {
    let word = VocabularyWord::new("cli", word, "");
    match commands::resolve_word(state, &word).await {
        Resolution::Resolved(audio) => {
            println!("{}: {}", word.english, audio.source);
            match &audio.reference {
                AudioReference::Cached(payload) => {
                    println!("  {} bytes, {}", payload.len(), payload.content_type)
                }
                AudioReference::ProxyRelay { url, payload }
                | AudioReference::DirectThirdParty { url, payload } => {
                    println!("  {} bytes, {} from {}", payload.len(), payload.content_type, url)
                }
                AudioReference::OnDeviceSynthesis(utterance) => {
                    println!("  on-device voice {} at rate {}", utterance.locale.voice(), utterance.rate)
                }
            }
            Ok(())
        }
        Resolution::Unresolved => bail!("No audio source could resolve '{}'", word.english),
    }
}

async fn cache(state: &AppState, action: CacheAction) -> Result<()> {
    if !state.cache.is_available() {
        bail!("Audio cache is unavailable");
    }
    match action {
        CacheAction::Usage => {
            let usage = commands::cache_usage(state).await;
            let entries = commands::cache_entry_count(state).await;
            println!(
                "{} entries, {} KiB used of {} KiB",
                entries,
                usage.used / 1024,
                usage.quota / 1024
            );
            if let Some(meta) = commands::cache_metadata(state).await {
                println!(
                    "Last preload {}: {}/{} words",
                    meta.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
                    meta.successful_words,
                    meta.total_words
                );
            }
        }
        CacheAction::Sweep => {
            let removed = commands::sweep_cache(state).await;
            println!("Removed {} expired entries", removed);
        }
        CacheAction::Clear => {
            if !commands::clear_cache(state).await {
                bail!("Failed to clear the audio cache");
            }
            println!("Audio cache cleared");
        }
    }
    Ok(())
}
