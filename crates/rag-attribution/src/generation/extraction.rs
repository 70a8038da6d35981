//! Extraction results shared by both citation strategies

use serde::Serialize;

use crate::types::CitedSentence;

/// Recoverable problem found while extracting citations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionDiagnostic {
    /// The sentence text could not be located in the raw output
    LookupMiss { sentence: usize, text: String },
    /// A bracketed fragment did not parse as citation numbers
    ParseFailure { sentence: usize, fragment: String },
}

impl ExtractionDiagnostic {
    /// Index of the sentence the diagnostic refers to
    pub fn sentence(&self) -> usize {
        match self {
            ExtractionDiagnostic::LookupMiss { sentence, .. }
            | ExtractionDiagnostic::ParseFailure { sentence, .. } => *sentence,
        }
    }
}

/// Cited sentences plus anything worth reporting about how they were produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub sentences: Vec<CitedSentence>,
    pub diagnostics: Vec<ExtractionDiagnostic>,
}
