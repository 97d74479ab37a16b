// Audio source kinds and the references produced by resolution
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Which step of the source chain produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioSourceKind {
    Cached,
    Preloaded,
    ProxyRelay,
    DirectThirdParty,
    OnDeviceSynthesis,
}

impl AudioSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Preloaded => "preloaded",
            Self::ProxyRelay => "proxy-relay",
            Self::DirectThirdParty => "direct-third-party",
            Self::OnDeviceSynthesis => "on-device-synthesis",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cached" => Some(Self::Cached),
            "preloaded" => Some(Self::Preloaded),
            "proxy-relay" => Some(Self::ProxyRelay),
            "direct-third-party" => Some(Self::DirectThirdParty),
            "on-device-synthesis" => Some(Self::OnDeviceSynthesis),
            _ => None,
        }
    }
}

impl fmt::Display for AudioSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two configured locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh-CN")]
    Chinese,
}

impl Locale {
    /// Language tag understood by the TTS endpoints
    pub fn tag(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Chinese => "zh-CN",
        }
    }

    /// Voice tag for on-device synthesis
    pub fn voice(&self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::Chinese => "zh-CN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "en" | "en-us" | "english" => Some(Self::English),
            "zh" | "zh-cn" | "chinese" => Some(Self::Chinese),
            _ => None,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Binary audio plus its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl AudioPayload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn checksum(&self) -> String {
        blake3::hash(&self.bytes).to_hex().to_string()
    }
}

/// Text handed to the platform speech engine
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub locale: Locale,
    /// Relative speaking rate, 1.0 is the engine's normal speed
    pub rate: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, locale: Locale, rate: f32) -> Self {
        Self {
            text: text.into(),
            locale,
            rate,
        }
    }
}

/// A playable pronunciation. Each variant carries what its kind needs.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioReference {
    Cached(Arc<AudioPayload>),
    ProxyRelay {
        url: String,
        payload: Arc<AudioPayload>,
    },
    DirectThirdParty {
        url: String,
        payload: Arc<AudioPayload>,
    },
    OnDeviceSynthesis(Utterance),
}

impl AudioReference {
    pub fn kind(&self) -> AudioSourceKind {
        match self {
            Self::Cached(_) => AudioSourceKind::Cached,
            Self::ProxyRelay { .. } => AudioSourceKind::ProxyRelay,
            Self::DirectThirdParty { .. } => AudioSourceKind::DirectThirdParty,
            Self::OnDeviceSynthesis(_) => AudioSourceKind::OnDeviceSynthesis,
        }
    }

    pub fn payload(&self) -> Option<&AudioPayload> {
        match self {
            Self::Cached(payload) => Some(payload),
            Self::ProxyRelay { payload, .. } | Self::DirectThirdParty { payload, .. } => {
                Some(payload)
            }
            Self::OnDeviceSynthesis(_) => None,
        }
    }

    pub fn is_synthesis(&self) -> bool {
        matches!(self, Self::OnDeviceSynthesis(_))
    }
}

/// Outcome of a successful resolution: the step that satisfied it and the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAudio {
    pub source: AudioSourceKind,
    pub reference: AudioReference,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedAudio),
    Unresolved,
}

impl Resolution {
    pub fn resolved(source: AudioSourceKind, reference: AudioReference) -> Self {
        Self::Resolved(ResolvedAudio { source, reference })
    }

    pub fn source(&self) -> Option<AudioSourceKind> {
        match self {
            Self::Resolved(audio) => Some(audio.source),
            Self::Unresolved => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_string_roundtrip() {
        for kind in [
            AudioSourceKind::Cached,
            AudioSourceKind::Preloaded,
            AudioSourceKind::ProxyRelay,
            AudioSourceKind::DirectThirdParty,
            AudioSourceKind::OnDeviceSynthesis,
        ] {
            assert_eq!(AudioSourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AudioSourceKind::parse("speech-synthesis"), None);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&AudioSourceKind::DirectThirdParty).unwrap();
        assert_eq!(json, "\"direct-third-party\"");
    }

    #[test]
    fn test_locale_tags() {
        assert_eq!(Locale::English.tag(), "en");
        assert_eq!(Locale::Chinese.voice(), "zh-CN");
        assert_eq!(Locale::parse("zh-CN"), Some(Locale::Chinese));
        assert_eq!(Locale::parse("fr"), None);
        let json = serde_json::to_string(&Locale::Chinese).unwrap();
        assert_eq!(json, "\"zh-CN\"");
    }

    #[test]
    fn test_reference_kind_and_payload() {
        let payload = Arc::new(AudioPayload::new(vec![1, 2, 3], "audio/mpeg"));
        let reference = AudioReference::ProxyRelay {
            url: "http://relay/?text=a".to_string(),
            payload: Arc::clone(&payload),
        };
        assert_eq!(reference.kind(), AudioSourceKind::ProxyRelay);
        assert_eq!(reference.payload().map(|p| p.len()), Some(3));

        let speech = AudioReference::OnDeviceSynthesis(Utterance::new("a", Locale::English, 0.8));
        assert!(speech.is_synthesis());
        assert!(speech.payload().is_none());
    }
}
