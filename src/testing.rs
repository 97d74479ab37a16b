// Test doubles: scripted endpoints, a recording synthesizer, a canned HTTP server
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::audio::{AudioPayload, AudioSourceKind, Locale, SpeechSynthesizer, Utterance};
use crate::cancel::CancelToken;
use crate::error::AudioError;
use crate::network::{FetchedAudio, TtsEndpoint};
use crate::vocabulary::VocabularyWord;

#[derive(Clone, Copy, PartialEq)]
enum Behaviour {
    Works,
    FailsFetch,
    Unreachable,
    Hangs,
    EmptyBody,
}

/// Endpoint whose outcome per word is scripted up front
pub struct FakeEndpoint {
    kind: AudioSourceKind,
    behaviour: Behaviour,
    failing: HashSet<String>,
    fetches: Mutex<Vec<String>>,
    pings: AtomicUsize,
}

impl FakeEndpoint {
    pub fn new(kind: AudioSourceKind) -> Self {
        Self {
            kind,
            behaviour: Behaviour::Works,
            failing: HashSet::new(),
            fetches: Mutex::new(Vec::new()),
            pings: AtomicUsize::new(0),
        }
    }

    /// Ping and fetch both fail
    pub fn unreachable(mut self) -> Self {
        self.behaviour = Behaviour::Unreachable;
        self
    }

    /// Ping succeeds, every fetch fails
    pub fn failing(mut self) -> Self {
        self.behaviour = Behaviour::FailsFetch;
        self
    }

    /// Ping succeeds, fetch fails only for these words
    pub fn failing_for(mut self, words: &[&str]) -> Self {
        self.failing = words.iter().map(|w| w.to_string()).collect();
        self
    }

    /// Ping and fetch never complete
    pub fn hanging(mut self) -> Self {
        self.behaviour = Behaviour::Hangs;
        self
    }

    /// Fetch "succeeds" with a zero-length body
    pub fn empty_body(mut self) -> Self {
        self.behaviour = Behaviour::EmptyBody;
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().len()
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn payload_for(kind: AudioSourceKind, word: &str) -> AudioPayload {
        AudioPayload::new(format!("{}:{}", kind, word).into_bytes(), "audio/mpeg")
    }
}

#[async_trait]
impl TtsEndpoint for FakeEndpoint {
    fn kind(&self) -> AudioSourceKind {
        self.kind
    }

    async fn fetch(&self, text: &str, _locale: Locale) -> Result<FetchedAudio, AudioError> {
        self.fetches.lock().push(text.to_string());
        match self.behaviour {
            Behaviour::Hangs => std::future::pending().await,
            Behaviour::Unreachable | Behaviour::FailsFetch => {
                Err(AudioError::fetch(self.kind, text, "scripted failure"))
            }
            Behaviour::EmptyBody => Err(AudioError::EmptyPayload {
                kind: self.kind,
                word: text.to_string(),
            }),
            Behaviour::Works if self.failing.contains(text) => {
                Err(AudioError::fetch(self.kind, text, "scripted failure"))
            }
            Behaviour::Works => Ok(FetchedAudio {
                url: format!("fake://{}/{}", self.kind, text),
                payload: Self::payload_for(self.kind, text),
            }),
        }
    }

    async fn ping(&self) -> Result<(), AudioError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Hangs => std::future::pending().await,
            Behaviour::Unreachable => Err(AudioError::probe(self.kind, "scripted unreachable")),
            _ => Ok(()),
        }
    }
}

/// Synthesizer that records what it was asked to say
pub struct FakeSynthesizer {
    supported: bool,
    spoken: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self {
            supported: true,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn speak(&self, utterance: &Utterance, cancel: &CancelToken) -> Result<(), AudioError> {
        if !self.supported {
            return Err(AudioError::SynthesisUnsupported);
        }
        if cancel.is_cancelled() {
            return Err(AudioError::Cancelled);
        }
        self.spoken.lock().push(utterance.text.clone());
        Ok(())
    }
}

pub fn words(english: &[&str]) -> Vec<VocabularyWord> {
    english
        .iter()
        .enumerate()
        .map(|(i, w)| VocabularyWord::new(format!("w{}", i + 1), *w, ""))
        .collect()
}

/// Response served by [`serve`] for every request
#[derive(Clone)]
pub struct CannedResponse {
    status: u16,
    body: Vec<u8>,
    content_type: String,
}

impl CannedResponse {
    pub fn ok(body: Vec<u8>, content_type: &str) -> Self {
        Self {
            status: 200,
            body,
            content_type: content_type.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: b"{\"error\":\"All TTS services failed\"}".to_vec(),
            content_type: "application/json".to_string(),
        }
    }
}

/// Minimal HTTP/1.1 server on a random local port. Returns its base URL.
pub async fn serve(response: CannedResponse) -> String {
    serve_with(None, response).await
}

/// Like [`serve`], but requests whose head contains `needle` never get an answer
pub async fn serve_hanging_on(needle: &str, response: CannedResponse) -> String {
    serve_with(Some(needle.as_bytes().to_vec()), response).await
}

async fn serve_with(needle: Option<Vec<u8>>, response: CannedResponse) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = Arc::new(response);
    let needle = Arc::new(needle);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let response = Arc::clone(&response);
            let needle = Arc::clone(&needle);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                if let Some(needle) = needle.as_deref() {
                    if request.windows(needle.len()).any(|w| w == needle) {
                        // Keep the socket open without answering
                        std::future::pending::<()>().await;
                        return;
                    }
                }
                let is_head = request.starts_with(b"HEAD");
                let head = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    response.status,
                    response.content_type,
                    response.body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                if !is_head {
                    let _ = socket.write_all(&response.body).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}/tts", addr)
}

/// URL on a local port nothing listens on
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/tts", addr)
}
