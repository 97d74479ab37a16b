// Inbound operations for the presentation layer
use tracing::info;

use crate::audio::Resolution;
use crate::cancel::CancelToken;
use crate::db::models::{CacheMetadata, StorageUsage};
use crate::error::AudioError;
use crate::preload::{PreloadResult, ProgressEvent};
use crate::state::AppState;
use crate::vocabulary::VocabularyWord;

/// Resolve audio for a whole vocabulary, annotating each word in place
pub async fn preload_vocabulary<F>(
    state: &AppState,
    words: &mut [VocabularyWord],
    on_progress: F,
    cancel: &CancelToken,
) -> PreloadResult
where
    F: FnMut(&ProgressEvent),
{
    state.orchestrator.preload(words, on_progress, cancel).await
}

/// Interactive single-word resolution
pub async fn resolve_word(state: &AppState, word: &VocabularyWord) -> Resolution {
    state.chain.resolve(word).await
}

/// Manual "use on-device voice" action, available whatever preload reported
pub async fn speak_word(state: &AppState, text: &str, cancel: &CancelToken) -> Result<(), AudioError> {
    let synthesizer = state.chain.synthesizer();
    if !synthesizer.is_supported() {
        return Err(AudioError::SynthesisUnsupported);
    }
    info!(word = text, engine = synthesizer.name(), "Speaking word");
    synthesizer.speak(&state.chain.utterance(text), cancel).await
}

pub async fn cache_usage(state: &AppState) -> StorageUsage {
    state.cache.usage().await
}

pub async fn cache_entry_count(state: &AppState) -> usize {
    state.cache.len().await
}

pub async fn cache_metadata(state: &AppState) -> Option<CacheMetadata> {
    state.cache.metadata().await
}

/// Remove expired entries, returning how many went
pub async fn sweep_cache(state: &AppState) -> usize {
    state.cache.sweep_expired().await
}

pub async fn clear_cache(state: &AppState) -> bool {
    state.cache.clear().await
}
