// Contract shared by the relay and the direct third-party endpoint
use async_trait::async_trait;

use crate::audio::{AudioPayload, AudioSourceKind, Locale};
use crate::error::AudioError;

/// Audio fetched over the network, plus the URL it came from
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAudio {
    pub url: String,
    pub payload: AudioPayload,
}

#[async_trait]
pub trait TtsEndpoint: Send + Sync {
    fn kind(&self) -> AudioSourceKind;

    /// Independent requests one `fetch` may make, each with its own timeout
    fn attempts(&self) -> usize {
        1
    }

    /// Fetch a pronunciation. A zero-length body is `AudioError::EmptyPayload`.
    async fn fetch(&self, text: &str, locale: Locale) -> Result<FetchedAudio, AudioError>;

    /// Cheap reachability check used by the connectivity probe
    async fn ping(&self) -> Result<(), AudioError>;
}
