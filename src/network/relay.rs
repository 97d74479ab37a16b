// Client for the first-party relay that forwards to the TTS service
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::debug;

use super::endpoint::{FetchedAudio, TtsEndpoint};
use crate::audio::sniff::content_type_for;
use crate::audio::{AudioPayload, AudioSourceKind, Locale};
use crate::error::AudioError;

const KIND: AudioSourceKind = AudioSourceKind::ProxyRelay;

pub struct ProxyRelay {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ProxyRelay {
    pub fn new(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// `{base}?text=<word>&lang=<tag>`
    pub fn url_for(&self, text: &str, locale: Locale) -> Result<Url, String> {
        Url::parse_with_params(&self.base_url, &[("text", text), ("lang", locale.tag())])
            .map_err(|e| format!("invalid relay url '{}': {}", self.base_url, e))
    }
}

#[async_trait]
impl TtsEndpoint for ProxyRelay {
    fn kind(&self) -> AudioSourceKind {
        KIND
    }

    async fn fetch(&self, text: &str, locale: Locale) -> Result<FetchedAudio, AudioError> {
        let url = self
            .url_for(text, locale)
            .map_err(|e| AudioError::fetch(KIND, text, e))?;

        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AudioError::fetch(KIND, text, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AudioError::fetch(KIND, text, format!("HTTP {}", status)));
        }

        let header = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AudioError::fetch(KIND, text, format!("failed to read body: {}", e)))?;

        if bytes.is_empty() {
            return Err(AudioError::EmptyPayload {
                kind: KIND,
                word: text.to_string(),
            });
        }

        let content_type = content_type_for(header.as_deref(), &bytes);
        debug!(word = text, bytes = bytes.len(), content_type = %content_type, "Relay returned audio");

        Ok(FetchedAudio {
            url: url.to_string(),
            payload: AudioPayload::new(bytes.to_vec(), content_type),
        })
    }

    async fn ping(&self) -> Result<(), AudioError> {
        let url = self
            .url_for("test", Locale::English)
            .map_err(|e| AudioError::probe(KIND, e))?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AudioError::probe(KIND, e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AudioError::probe(KIND, format!("HTTP {}", response.status())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve, CannedResponse};

    fn relay(base: &str) -> ProxyRelay {
        ProxyRelay::new(Client::new(), base, Duration::from_secs(3))
    }

    #[test]
    fn test_url_encodes_text() {
        let url = relay("http://localhost:3000/api/tts-proxy")
            .url_for("ice cream & co", Locale::Chinese)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/tts-proxy?text=ice+cream+%26+co&lang=zh-CN"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(relay("not a url").url_for("a", Locale::English).is_err());
    }

    #[tokio::test]
    async fn test_fetch_accepts_audio() {
        let base = serve(CannedResponse::ok(b"ID3audio".to_vec(), "audio/mpeg")).await;
        let fetched = relay(&base).fetch("apple", Locale::English).await.unwrap();
        assert_eq!(fetched.payload.bytes, b"ID3audio".to_vec());
        assert_eq!(fetched.payload.content_type, "audio/mpeg");
        assert!(fetched.url.contains("text=apple"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_body() {
        let base = serve(CannedResponse::ok(Vec::new(), "audio/mpeg")).await;
        let err = relay(&base).fetch("apple", Locale::English).await.unwrap_err();
        assert_eq!(
            err,
            AudioError::EmptyPayload {
                kind: AudioSourceKind::ProxyRelay,
                word: "apple".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let base = serve(CannedResponse::status(503)).await;
        let err = relay(&base).fetch("apple", Locale::English).await.unwrap_err();
        assert!(matches!(err, AudioError::SourceFetchFailure { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_ping_requires_success_status() {
        let ok = serve(CannedResponse::ok(b"x".to_vec(), "audio/mpeg")).await;
        assert!(relay(&ok).ping().await.is_ok());

        let down = serve(CannedResponse::status(500)).await;
        assert!(matches!(
            relay(&down).ping().await,
            Err(AudioError::ProbeFailure { .. })
        ));
    }
}
