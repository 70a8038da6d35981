//! Citation assignment from vendor-reported character spans

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::extraction::{Extraction, ExtractionDiagnostic};
use crate::error::{Error, Result};
use crate::text::SentenceSplitter;
use crate::types::CitedSentence;

/// Half-open character range of generated text backed by source documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationSpan {
    /// First character of the cited range
    pub start: usize,
    /// One past the last character
    pub end: usize,
    /// Indices of the supporting documents in prompt order
    pub document_ids: BTreeSet<usize>,
}

impl CitationSpan {
    /// Create a span from document indices
    pub fn new(start: usize, end: usize, document_ids: impl IntoIterator<Item = usize>) -> Self {
        Self {
            start,
            end,
            document_ids: document_ids.into_iter().collect(),
        }
    }

    /// Create a span from vendor document ids such as `doc_3`
    pub fn from_vendor<S: AsRef<str>>(start: usize, end: usize, document_ids: &[S]) -> Result<Self> {
        let document_ids = document_ids
            .iter()
            .map(|id| parse_vendor_id(id.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self {
            start,
            end,
            document_ids,
        })
    }

    /// Whether this span should be attributed to the sentence at `[start, end)`
    ///
    /// Four cases count as overlap: span inside the sentence, span ending
    /// inside it, span starting inside it, and span covering it entirely.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        let inside = self.start >= start && self.end <= end;
        let ends_inside = self.start < start && self.end > start && self.end <= end;
        let starts_inside = self.start >= start && self.start < end && self.end > end;
        let covers = self.start < start && self.end > end;
        inside || ends_inside || starts_inside || covers
    }
}

fn parse_vendor_id(id: &str) -> Result<usize> {
    id.trim()
        .trim_start_matches("doc_")
        .parse()
        .map_err(|_| Error::invalid_input(format!("unrecognized vendor document id {:?}", id)))
}

/// Character offsets of the first occurrence of `needle` in `haystack`
fn char_range(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let byte_start = haystack.find(needle)?;
    let start = haystack[..byte_start].chars().count();
    Some((start, start + needle.chars().count()))
}

/// Maps each sentence to the documents whose spans overlap it
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanCitationExtractor;

impl SpanCitationExtractor {
    /// Split `raw_text` and attach overlapping span documents to each sentence
    ///
    /// Citations are deduplicated and sorted ascending. A sentence that cannot
    /// be located in `raw_text` gets no citations and a lookup-miss diagnostic.
    pub fn extract<S>(&self, raw_text: &str, spans: &[CitationSpan], splitter: &S) -> Extraction
    where
        S: SentenceSplitter + ?Sized,
    {
        let mut extraction = Extraction::default();

        for (idx, sentence) in splitter.split(raw_text).into_iter().enumerate() {
            let citations: Vec<usize> = match char_range(raw_text, &sentence) {
                Some((start, end)) => spans
                    .iter()
                    .filter(|span| span.overlaps(start, end))
                    .flat_map(|span| span.document_ids.iter().copied())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                None => {
                    tracing::warn!(sentence = idx, "Sentence not found in generated text");
                    extraction.diagnostics.push(ExtractionDiagnostic::LookupMiss {
                        sentence: idx,
                        text: sentence.clone(),
                    });
                    Vec::new()
                }
            };
            extraction.sentences.push(CitedSentence::new(sentence, citations));
        }

        extraction
    }
}
