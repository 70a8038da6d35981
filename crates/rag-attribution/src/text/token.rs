//! Token counting for prompt budgeting

use crate::error::Result;

/// Counts tokens the way a particular generator backend does
///
/// Any `Fn(&str) -> usize` is a counter.
pub trait TokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize,
{
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self(text))
    }
}

/// Whitespace word count, an approximation when no tokenizer is available
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenCounter;

impl TokenCounter for WhitespaceTokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

#[cfg(feature = "hf-tokenizer")]
pub use hf::HuggingFaceTokenCounter;

#[cfg(feature = "hf-tokenizer")]
mod hf {
    use std::path::Path;

    use tokenizers::Tokenizer;

    use super::TokenCounter;
    use crate::error::{Error, Result};

    /// Counts tokens with a `tokenizer.json` from the Hugging Face hub
    pub struct HuggingFaceTokenCounter {
        tokenizer: Tokenizer,
    }

    impl HuggingFaceTokenCounter {
        /// Load a tokenizer from a `tokenizer.json` file
        pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
            let tokenizer = Tokenizer::from_file(path.as_ref())
                .map_err(|e| Error::tokenizer(format!("Failed to load tokenizer: {}", e)))?;
            Ok(Self { tokenizer })
        }
    }

    impl TokenCounter for HuggingFaceTokenCounter {
        fn count_tokens(&self, text: &str) -> Result<usize> {
            let encoding = self
                .tokenizer
                .encode(text, false)
                .map_err(|e| Error::tokenizer(format!("Failed to encode prompt: {}", e)))?;
            Ok(encoding.len())
        }
    }
}
