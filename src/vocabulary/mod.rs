// Vocabulary module
// The words being drilled and a minimal word-list reader

pub mod parser;

use crate::audio::AudioReference;

/// A word owned by the caller. The engine only writes `audio`.
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyWord {
    pub id: String,
    pub english: String,
    pub translation: String,
    pub audio: Option<AudioReference>,
}

impl VocabularyWord {
    pub fn new(id: impl Into<String>, english: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            english: english.into(),
            translation: translation.into(),
            audio: None,
        }
    }

    /// Carries fetched or cached audio, not just a synthesis marker
    pub fn has_payload(&self) -> bool {
        self.audio.as_ref().is_some_and(|a| a.payload().is_some())
    }
}

pub use parser::{parse_word_list, read_word_list};
