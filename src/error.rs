// Error taxonomy for the audio resolution engine
use std::time::Duration;

use thiserror::Error;

use crate::audio::AudioSourceKind;

/// Every failure the engine can observe. None of these escape to callers of
/// `preload`/`resolve`; they are logged, counted and recorded in the debug log.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AudioError {
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("{kind} probe timed out after {}ms", .after.as_millis())]
    ProbeTimeout {
        kind: AudioSourceKind,
        after: Duration,
    },

    #[error("{kind} probe failed: {reason}")]
    ProbeFailure {
        kind: AudioSourceKind,
        reason: String,
    },

    #[error("{kind} fetch failed for '{word}': {reason}")]
    SourceFetchFailure {
        kind: AudioSourceKind,
        word: String,
        reason: String,
    },

    #[error("{kind} returned an empty payload for '{word}'")]
    EmptyPayload {
        kind: AudioSourceKind,
        word: String,
    },

    #[error("speech synthesis is not supported on this platform")]
    SynthesisUnsupported,

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("cancelled")]
    Cancelled,
}

impl AudioError {
    pub fn fetch(kind: AudioSourceKind, word: &str, reason: impl Into<String>) -> Self {
        Self::SourceFetchFailure {
            kind,
            word: word.to_string(),
            reason: reason.into(),
        }
    }

    pub fn probe(kind: AudioSourceKind, reason: impl Into<String>) -> Self {
        Self::ProbeFailure {
            kind,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_word_and_kind() {
        let err = AudioError::EmptyPayload {
            kind: AudioSourceKind::ProxyRelay,
            word: "apple".to_string(),
        };
        assert_eq!(err.to_string(), "proxy-relay returned an empty payload for 'apple'");
    }

    #[test]
    fn test_probe_timeout_message() {
        let err = AudioError::ProbeTimeout {
            kind: AudioSourceKind::DirectThirdParty,
            after: Duration::from_millis(2000),
        };
        assert_eq!(err.to_string(), "direct-third-party probe timed out after 2000ms");
    }
}
