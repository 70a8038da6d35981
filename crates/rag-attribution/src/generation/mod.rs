//! Prompt construction and citation extraction

pub mod extraction;
pub mod marker;
pub mod prompt;
pub mod provider;
pub mod span;
pub mod strategy;

pub use extraction::{Extraction, ExtractionDiagnostic};
pub use marker::MarkerCitationExtractor;
pub use prompt::{FittedPrompt, PromptBudgetFitter, PromptMode, PromptTemplate};
pub use provider::{Generator, GeneratorOutput};
pub use span::{CitationSpan, SpanCitationExtractor};
pub use strategy::{CitationMode, CitationStrategy};
