// Direct access to the unofficial third-party TTS endpoint
// Several client variants are tried in order; they fail independently.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use reqwest::{Client, Url};
use tracing::debug;

use super::endpoint::{FetchedAudio, TtsEndpoint};
use crate::audio::sniff::content_type_for;
use crate::audio::{AudioPayload, AudioSourceKind, Locale};
use crate::error::AudioError;

const KIND: AudioSourceKind = AudioSourceKind::DirectThirdParty;
const REFERER_URL: &str = "https://translate.google.com/";

pub struct DirectThirdParty {
    client: Client,
    base_url: String,
    clients: Vec<String>,
    timeout: Duration,
    probe_timeout: Duration,
}

impl DirectThirdParty {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        clients: Vec<String>,
        timeout: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            clients,
            timeout,
            probe_timeout,
        }
    }

    /// One URL per configured client variant
    pub fn urls_for(&self, text: &str, locale: Locale) -> Vec<Url> {
        self.clients
            .iter()
            .filter_map(|client| {
                Url::parse_with_params(
                    &self.base_url,
                    &[
                        ("ie", "UTF-8"),
                        ("q", text),
                        ("tl", locale.tag()),
                        ("client", client.as_str()),
                    ],
                )
                .ok()
            })
            .collect()
    }

    async fn fetch_one(&self, url: &Url, text: &str) -> Result<FetchedAudio, AudioError> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "audio/mpeg, audio/*, */*")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(REFERER, REFERER_URL)
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

        Ok(FetchedAudio {
            url: url.to_string(),
            payload: AudioPayload::new(bytes.to_vec(), content_type_for(header.as_deref(), &bytes)),
        })
    }
}

#[async_trait]
impl TtsEndpoint for DirectThirdParty {
    fn kind(&self) -> AudioSourceKind {
        KIND
    }

    fn attempts(&self) -> usize {
        self.clients.len().max(1)
    }

    async fn fetch(&self, text: &str, locale: Locale) -> Result<FetchedAudio, AudioError> {
        let urls = self.urls_for(text, locale);
        let mut last_error = AudioError::fetch(KIND, text, "no usable endpoint url configured");

        for (i, url) in urls.iter().enumerate() {
            match self.fetch_one(url, text).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) => {
                    debug!(word = text, variant = i + 1, total = urls.len(), error = %e, "Direct TTS variant failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Any HTTP response at all means the host is reachable
    async fn ping(&self) -> Result<(), AudioError> {
        let url = self
            .urls_for("test", Locale::English)
            .into_iter()
            .next()
            .ok_or_else(|| AudioError::probe(KIND, "no usable endpoint url configured"))?;

        self.client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| AudioError::probe(KIND, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{closed_url, serve, CannedResponse};

    fn direct(base: &str) -> DirectThirdParty {
        DirectThirdParty::new(
            Client::new(),
            base,
            vec!["tw-ob".to_string(), "gtx".to_string()],
            Duration::from_secs(3),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_urls_per_client_variant() {
        let urls = direct("https://translate.google.com/translate_tts").urls_for("hello", Locale::English);
        assert_eq!(urls.len(), 2);
        assert_eq!(
            urls[0].as_str(),
            "https://translate.google.com/translate_tts?ie=UTF-8&q=hello&tl=en&client=tw-ob"
        );
        assert!(urls[1].as_str().ends_with("client=gtx"));
    }

    #[tokio::test]
    async fn test_error_status_tries_every_variant() {
        let base = serve(CannedResponse::status(429)).await;
        let err = direct(&base).fetch("apple", Locale::English).await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_ping_accepts_any_response() {
        let base = serve(CannedResponse::status(404)).await;
        assert!(direct(&base).ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_fails_when_unreachable() {
        let base = closed_url().await;
        let err = direct(&base).ping().await.unwrap_err();
        assert!(matches!(err, AudioError::ProbeFailure { .. }));
    }
}
