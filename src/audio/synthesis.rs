// On-device speech synthesis
//
// The last step of the source chain. Nothing is fetched ahead of time: a
// synthesis reference only carries the text, and `speak` renders it on demand.
// `speak` resolves when the utterance ends, errors if the engine reports a
// failure, and returns `AudioError::Cancelled` when the token fires.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::audio::source::{Locale, Utterance};
use crate::cancel::CancelToken;
use crate::error::AudioError;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// False only when the platform has no synthesis capability at all
    fn is_supported(&self) -> bool;

    async fn speak(&self, utterance: &Utterance, cancel: &CancelToken) -> Result<(), AudioError>;
}

/// Which engine to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisBackend {
    #[default]
    Auto,
    Command,
    Native,
    None,
}

/// Pick a synthesizer for the configured backend. Falls back to `NoSynthesizer`
/// when nothing usable is found, which makes synthesis steps report unsupported.
pub fn select_synthesizer(backend: SynthesisBackend, command: &str) -> Arc<dyn SpeechSynthesizer> {
    match backend {
        SynthesisBackend::None => Arc::new(NoSynthesizer),
        SynthesisBackend::Command => Arc::new(CommandSynthesizer::new(command)),
        SynthesisBackend::Native => native_or_none(),
        SynthesisBackend::Auto => {
            let native = native_or_none();
            if native.is_supported() {
                return native;
            }
            let cmd = CommandSynthesizer::new(command);
            if cmd.is_supported() {
                info!(program = command, "Using command speech synthesizer");
                return Arc::new(cmd);
            }
            warn!("No speech synthesis capability found");
            Arc::new(NoSynthesizer)
        }
    }
}

#[cfg(feature = "native-tts")]
fn native_or_none() -> Arc<dyn SpeechSynthesizer> {
    match super::native::NativeSynthesizer::new() {
        Some(engine) => Arc::new(engine),
        None => Arc::new(NoSynthesizer),
    }
}

#[cfg(not(feature = "native-tts"))]
fn native_or_none() -> Arc<dyn SpeechSynthesizer> {
    Arc::new(NoSynthesizer)
}

/// Platform without speech synthesis
pub struct NoSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NoSynthesizer {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_supported(&self) -> bool {
        false
    }

    async fn speak(&self, _utterance: &Utterance, _cancel: &CancelToken) -> Result<(), AudioError> {
        Err(AudioError::SynthesisUnsupported)
    }
}

/// Speaks through an external program with espeak-compatible arguments
pub struct CommandSynthesizer {
    program: String,
    resolved: Option<PathBuf>,
}

/// espeak's default speed in words per minute
const NORMAL_WPM: f32 = 175.0;

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let resolved = find_program(&program);
        Self { program, resolved }
    }

    fn args(utterance: &Utterance) -> Vec<String> {
        let voice = match utterance.locale {
            Locale::English => "en-us",
            Locale::Chinese => "zh",
        };
        let wpm = (NORMAL_WPM * utterance.rate.clamp(0.25, 3.0)).round() as u32;
        vec![
            "-v".to_string(),
            voice.to_string(),
            "-s".to_string(),
            wpm.to_string(),
            utterance.text.clone(),
        ]
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    fn name(&self) -> &'static str {
        "command"
    }

    fn is_supported(&self) -> bool {
        self.resolved.is_some()
    }

    async fn speak(&self, utterance: &Utterance, cancel: &CancelToken) -> Result<(), AudioError> {
        let Some(path) = self.resolved.as_ref() else {
            return Err(AudioError::SynthesisUnsupported);
        };
        if cancel.is_cancelled() {
            return Err(AudioError::Cancelled);
        }

        let mut child = Command::new(path)
            .args(Self::args(utterance))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AudioError::SynthesisFailed(format!("failed to start {}: {}", self.program, e)))?;

        debug!(text = %utterance.text, locale = %utterance.locale, "Speech started");

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        match status {
            Some(Ok(status)) if status.success() => {
                debug!(text = %utterance.text, "Speech ended");
                Ok(())
            }
            Some(Ok(status)) => Err(AudioError::SynthesisFailed(format!(
                "{} exited with {}",
                self.program, status
            ))),
            Some(Err(e)) => Err(AudioError::SynthesisFailed(e.to_string())),
            None => {
                let _ = child.kill().await;
                Err(AudioError::Cancelled)
            }
        }
    }
}

/// Locate `program` either as a path or on PATH
fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let full = dir.join(program);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
