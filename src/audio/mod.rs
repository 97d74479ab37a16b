// Audio module
// Source kinds, references, payload sniffing and on-device synthesis

#[cfg(feature = "native-tts")]
pub mod native;
pub mod sniff;
pub mod source;
pub mod synthesis;

pub use source::{
    AudioPayload, AudioReference, AudioSourceKind, Locale, Resolution, ResolvedAudio, Utterance,
};
pub use synthesis::{select_synthesizer, SpeechSynthesizer, SynthesisBackend};
