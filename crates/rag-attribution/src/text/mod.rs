//! Text normalization shared by prompt building, extraction and validation

pub mod sentence;
pub mod token;

pub use sentence::{SentenceSplitter, UnicodeSentenceSplitter};
pub use token::{TokenCounter, WhitespaceTokenCounter};

#[cfg(feature = "hf-tokenizer")]
pub use token::HuggingFaceTokenCounter;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static BRACKETED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("Invalid regex"));

/// Strip control characters and collapse all whitespace runs to one space
pub fn normalize_snippet(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep at most `max_words` whitespace-delimited words
pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite literal `[n]` as `(n)` so passages cannot fake citation markup
pub fn escape_citation_markers(text: &str) -> String {
    BRACKETED_NUMBER.replace_all(text, "($1)").into_owned()
}

/// Word count used for every response length: NFKC-normalize, then split on whitespace
pub fn word_count(text: &str) -> usize {
    text.trim()
        .nfkc()
        .collect::<String>()
        .split_whitespace()
        .count()
}

/// Total word count over several sentences
pub fn total_word_count<'a>(texts: impl IntoIterator<Item = &'a str>) -> usize {
    texts.into_iter().map(word_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_snippet() {
        let raw = "  Line one\nline\ttwo\u{0007}  end  ";
        assert_eq!(normalize_snippet(raw), "Line one line two end");
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("a b c d", 2), "a b");
        assert_eq!(truncate_words("a b", 10), "a b");
        assert_eq!(truncate_words("a b", 0), "");
    }

    #[test]
    fn test_escape_citation_markers() {
        assert_eq!(
            escape_citation_markers("see [12] and [x] and [3]"),
            "see (12) and [x] and (3)"
        );
    }

    #[test]
    fn test_word_count_applies_nfkc() {
        // U+FB01 (fi ligature) and a full-width space normalize to ASCII
        assert_eq!(word_count("  \u{FB01}ne\u{3000}day  "), 2);
        assert_eq!(word_count(""), 0);
        assert_eq!(total_word_count(["one two", "three"]), 3);
    }
}
