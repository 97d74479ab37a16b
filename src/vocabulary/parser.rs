// Word-list reading for the command line
//
// One entry per line: `english<sep>translation`, where the separator is a
// tab, comma or semicolon. Blank lines and `#` comments are skipped.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::VocabularyWord;

/// Get the regex pattern for splitting a line into its two columns
fn get_separator_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s*[\t,;，]\s*").unwrap())
}

/// Parse word-list text into vocabulary, assigning ids by position
///
/// # Examples
/// ```
/// use wordvoice_lib::vocabulary::parse_word_list;
/// let words = parse_word_list("apple, 苹果\nbanana\t香蕉");
/// assert_eq!(words[1].translation, "香蕉");
/// ```
pub fn parse_word_list(content: &str) -> Vec<VocabularyWord> {
    let regex = get_separator_regex();

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut parts = regex.splitn(line, 2);
            let english = parts.next()?.trim();
            if english.is_empty() {
                return None;
            }
            let translation = parts.next().unwrap_or("").trim();
            Some((english.to_string(), translation.to_string()))
        })
        .enumerate()
        .map(|(i, (english, translation))| VocabularyWord::new(format!("w{}", i + 1), english, translation))
        .collect()
}

/// Read and parse a word-list file
pub fn read_word_list(path: &Path) -> Result<Vec<VocabularyWord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read word list: {}", path.display()))?;
    Ok(parse_word_list(&content))
}
