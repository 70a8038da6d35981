//! Inline bracket marker parsing for generators without native citations

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use super::extraction::{Extraction, ExtractionDiagnostic};
use crate::text::SentenceSplitter;
use crate::types::CitedSentence;

/// `[n]` with an optional trailing comma and space
static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\],? ?").expect("Invalid regex"));

/// Any bracketed fragment without nested brackets
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("Invalid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));

static SPACE_BEFORE_FINAL_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.!?;:]+)$").expect("Invalid regex"));

/// Parses `[n]` and `[n, m]` markers into zero-based document indices
#[derive(Debug, Clone, Default)]
pub struct MarkerCitationExtractor {
    citation_range: BTreeSet<usize>,
}

impl MarkerCitationExtractor {
    /// Create an extractor accepting only indices in `citation_range`
    pub fn new(citation_range: impl IntoIterator<Item = usize>) -> Self {
        Self {
            citation_range: citation_range.into_iter().collect(),
        }
    }

    /// Extractor for a prompt that numbered `documents` references from 1
    pub fn for_documents(documents: usize) -> Self {
        Self::new(0..documents)
    }

    /// Indices a marker may resolve to
    pub fn citation_range(&self) -> &BTreeSet<usize> {
        &self.citation_range
    }

    fn resolve(&self, number: u64) -> Option<usize> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.citation_range.contains(&index).then_some(index)
    }

    /// Split `raw_text`, strip markers from each sentence and collect citations
    pub fn extract<S>(&self, raw_text: &str, splitter: &S) -> Extraction
    where
        S: SentenceSplitter + ?Sized,
    {
        let mut extraction = Extraction::default();

        for (idx, sentence) in splitter.split(raw_text).into_iter().enumerate() {
            let (text, citations, failures) = self.parse_sentence(&sentence);
            for fragment in failures {
                tracing::warn!(sentence = idx, fragment = %fragment, "Unparsable citation marker");
                extraction
                    .diagnostics
                    .push(ExtractionDiagnostic::ParseFailure { sentence: idx, fragment });
            }
            extraction.sentences.push(CitedSentence::new(text, citations));
        }

        extraction
    }

    /// Returns cleaned text, citations in order of appearance and unparsable fragments
    fn parse_sentence(&self, sentence: &str) -> (String, Vec<usize>, Vec<String>) {
        let mut citations = Vec::new();
        let mut failures = Vec::new();

        let stripped = if MARKER.is_match(sentence) {
            for caps in MARKER.captures_iter(sentence) {
                // Overlong numbers cannot be in range
                if let Some(index) = caps[1].parse().ok().and_then(|n| self.resolve(n)) {
                    citations.push(index);
                }
            }
            MARKER.replace_all(sentence, "").into_owned()
        } else {
            BRACKETED
                .replace_all(sentence, |caps: &regex::Captures<'_>| {
                    let (found, malformed) = self.parse_group(&caps[1]);
                    if malformed {
                        failures.push(caps[0].to_string());
                    }
                    if found.is_empty() {
                        caps[0].to_string()
                    } else {
                        citations.extend(found);
                        String::new()
                    }
                })
                .into_owned()
        };

        let mut seen = BTreeSet::new();
        citations.retain(|c| seen.insert(*c));

        (tidy(&stripped), citations, failures)
    }

    /// Parse a comma-separated group into in-range indices
    ///
    /// Numeric tokens are kept even when others in the group are not numbers;
    /// the flag reports whether any token failed to parse.
    fn parse_group(&self, inner: &str) -> (Vec<usize>, bool) {
        let mut found = Vec::new();
        let mut malformed = false;
        for token in inner.split(',') {
            match token.trim().parse::<u64>() {
                Ok(number) => found.extend(self.resolve(number)),
                Err(_) => malformed = true,
            }
        }
        (found, malformed)
    }
}

fn tidy(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    SPACE_BEFORE_FINAL_PUNCT
        .replace(&collapsed, "$1")
        .into_owned()
}
