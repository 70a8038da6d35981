//! Explicit choice between span-based and marker-based attribution

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::extraction::Extraction;
use super::marker::MarkerCitationExtractor;
use super::span::{CitationSpan, SpanCitationExtractor};
use crate::text::SentenceSplitter;

/// How a generator backend reports citations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationMode {
    /// Character spans bound to document ids
    Span,
    /// Inline `[n]` markers in the text
    #[default]
    Marker,
}

/// Citation extraction strategy, chosen by the caller per backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationStrategy {
    Span { spans: Vec<CitationSpan> },
    Marker { citation_range: BTreeSet<usize> },
}

impl CitationStrategy {
    /// Span strategy over vendor spans
    pub fn span(spans: Vec<CitationSpan>) -> Self {
        CitationStrategy::Span { spans }
    }

    /// Marker strategy for a prompt with `documents` numbered references
    pub fn marker(documents: usize) -> Self {
        CitationStrategy::Marker {
            citation_range: (0..documents).collect(),
        }
    }

    pub fn mode(&self) -> CitationMode {
        match self {
            CitationStrategy::Span { .. } => CitationMode::Span,
            CitationStrategy::Marker { .. } => CitationMode::Marker,
        }
    }

    /// Turn raw generator text into cited sentences
    pub fn extract<S>(&self, raw_text: &str, splitter: &S) -> Extraction
    where
        S: SentenceSplitter + ?Sized,
    {
        match self {
            CitationStrategy::Span { spans } => {
                SpanCitationExtractor.extract(raw_text, spans, splitter)
            }
            CitationStrategy::Marker { citation_range } => {
                MarkerCitationExtractor::new(citation_range.iter().copied())
                    .extract(raw_text, splitter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::UnicodeSentenceSplitter;

    #[test]
    fn test_dispatch() {
        let text = "Alpha [1]. Beta.";

        let marker = CitationStrategy::marker(1);
        assert_eq!(marker.mode(), CitationMode::Marker);
        let extraction = marker.extract(text, &UnicodeSentenceSplitter);
        assert_eq!(extraction.sentences[0].citations, vec![0]);
        assert_eq!(extraction.sentences[0].text, "Alpha.");

        let span = CitationStrategy::span(vec![CitationSpan::new(11, 16, [0])]);
        assert_eq!(span.mode(), CitationMode::Span);
        let extraction = span.extract(text, &UnicodeSentenceSplitter);
        assert!(extraction.sentences[0].citations.is_empty());
        assert_eq!(extraction.sentences[1].citations, vec![0]);
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(serde_json::to_string(&CitationMode::Span).unwrap(), "\"span\"");
        assert_eq!(CitationMode::default(), CitationMode::Marker);
    }
}
