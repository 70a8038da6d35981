//! Generator collaborator trait

use async_trait::async_trait;

use super::prompt::FittedPrompt;
use super::span::CitationSpan;
use crate::config::GeneratorProfile;
use crate::error::Result;

/// Raw generator output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOutput {
    /// Generated text, possibly containing `[n]` markers
    pub text: String,
    /// Vendor-native citation spans, when the backend reports them
    pub spans: Option<Vec<CitationSpan>>,
}

impl GeneratorOutput {
    /// Output of a backend that writes inline markers
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: None,
        }
    }

    /// Output of a backend with native citation spans
    pub fn with_spans(text: impl Into<String>, spans: Vec<CitationSpan>) -> Self {
        Self {
            text: text.into(),
            spans: Some(spans),
        }
    }
}

/// Trait for answer generation backends
///
/// Implementations own their client state. The engine only sees the fitted
/// prompt going in and the raw output coming back.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate an answer for a prompt that already fits the context window
    async fn generate(&self, prompt: &FittedPrompt) -> Result<GeneratorOutput>;

    /// Backend name for logging
    fn name(&self) -> &str;

    /// Model and citation mode of this backend
    fn profile(&self) -> &GeneratorProfile;
}
