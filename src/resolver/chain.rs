// Ordered audio sources for a single word.
//
// Strict priority, first success wins:
// preloaded reference, cache, proxy relay, direct third-party, on-device
// synthesis. Network successes are written back to the cache so the next
// resolution of the same word stops at the cache. No step raises; the
// result is a typed reference or `Resolution::Unresolved`.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::audio::{
    AudioReference, AudioSourceKind, Locale, Resolution, SpeechSynthesizer, Utterance,
};
use crate::cache::CacheStore;
use crate::cancel::CancelToken;
use crate::debug_log::DebugLog;
use crate::error::AudioError;
use crate::network::TtsEndpoint;
use crate::vocabulary::VocabularyWord;

/// How far down the chain to go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    /// Every step, synthesis included
    Full,
    /// Stop before synthesis; synthesis markers are retried over the network
    NetworkOnly,
}

pub struct SourceChain {
    cache: Arc<CacheStore>,
    relay: Arc<dyn TtsEndpoint>,
    direct: Arc<dyn TtsEndpoint>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    locale: Locale,
    speech_rate: f32,
    step_timeout: Duration,
}

impl SourceChain {
    pub fn new(
        cache: Arc<CacheStore>,
        relay: Arc<dyn TtsEndpoint>,
        direct: Arc<dyn TtsEndpoint>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        locale: Locale,
        step_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            relay,
            direct,
            synthesizer,
            locale,
            speech_rate: 0.8,
            step_timeout,
        }
    }

    pub fn with_speech_rate(mut self, rate: f32) -> Self {
        self.speech_rate = rate;
        self
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn synthesizer(&self) -> &Arc<dyn SpeechSynthesizer> {
        &self.synthesizer
    }

    pub fn utterance(&self, text: &str) -> Utterance {
        Utterance::new(text.trim(), self.locale, self.speech_rate)
    }

    /// Interactive resolution of one word, every step allowed
    pub async fn resolve(&self, word: &VocabularyWord) -> Resolution {
        let mut log = DebugLog::new();
        self.resolve_with(word, ChainMode::Full, &mut log, &CancelToken::new())
            .await
    }

    pub async fn resolve_with(
        &self,
        word: &VocabularyWord,
        mode: ChainMode,
        log: &mut DebugLog,
        cancel: &CancelToken,
    ) -> Resolution {
        let text = word.english.trim();
        if text.is_empty() {
            log.push(format!("Skipping word {} with empty text", word.id));
            return Resolution::Unresolved;
        }

        // 1. Preloaded
        if let Some(reference) = &word.audio {
            if !reference.is_synthesis() {
                debug!(word = text, "Using preloaded audio");
                return Resolution::resolved(AudioSourceKind::Preloaded, reference.clone());
            }
            if mode == ChainMode::Full {
                return self.synthesize(text, log);
            }
        }

        // 2. Cached
        match self.cache.lookup(text).await {
            Ok(Some(entry)) => {
                debug!(word = text, "Cache hit");
                return Resolution::resolved(
                    AudioSourceKind::Cached,
                    AudioReference::Cached(Arc::new(entry.payload)),
                );
            }
            Ok(None) => {}
            Err(e) => log.push(format!("Cache lookup skipped for {}: {}", text, e)),
        }

        // 3. Proxy relay, 4. Direct third-party
        for endpoint in [&self.relay, &self.direct] {
            if cancel.is_cancelled() {
                log.push(format!("Cancelled before {} attempt for {}", endpoint.kind(), text));
                break;
            }
            match self.fetch(endpoint.as_ref(), text).await {
                Ok(reference) => {
                    if let Some(payload) = reference.payload() {
                        self.cache.put(text, payload, endpoint.kind()).await;
                    }
                    return Resolution::resolved(endpoint.kind(), reference);
                }
                Err(e) => log.push(format!("{} failed: {}", endpoint.kind(), e)),
            }
        }

        // 5. On-device synthesis
        match mode {
            ChainMode::Full => self.synthesize(text, log),
            ChainMode::NetworkOnly => Resolution::Unresolved,
        }
    }

    async fn fetch(&self, endpoint: &dyn TtsEndpoint, text: &str) -> Result<AudioReference, AudioError> {
        let kind = endpoint.kind();
        // Each variant of a multi-variant endpoint gets a full step timeout
        let budget = self.step_timeout * endpoint.attempts() as u32;
        let fetched = tokio::time::timeout(budget, endpoint.fetch(text, self.locale))
            .await
            .map_err(|_| AudioError::fetch(kind, text, format!("timed out after {}ms", budget.as_millis())))??;

        if fetched.payload.is_empty() {
            return Err(AudioError::EmptyPayload {
                kind,
                word: text.to_string(),
            });
        }

        let payload = Arc::new(fetched.payload);
        Ok(match kind {
            AudioSourceKind::DirectThirdParty => AudioReference::DirectThirdParty {
                url: fetched.url,
                payload,
            },
            _ => AudioReference::ProxyRelay {
                url: fetched.url,
                payload,
            },
        })
    }

    /// Synthesis is rendered on demand, so only capability is checked here
    fn synthesize(&self, text: &str, log: &mut DebugLog) -> Resolution {
        if !self.synthesizer.is_supported() {
            log.push(format!("{} for {}", AudioError::SynthesisUnsupported, text));
            return Resolution::Unresolved;
        }
        Resolution::resolved(
            AudioSourceKind::OnDeviceSynthesis,
            AudioReference::OnDeviceSynthesis(self.utterance(text)),
        )
    }
}
