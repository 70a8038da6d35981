//! Error types for the attribution engine

use thiserror::Error;

/// Result type alias for attribution operations
pub type Result<T> = std::result::Result<T, Error>;

/// Attribution engine errors
///
/// Only conditions that abort a single request live here. Recoverable
/// per-sentence problems are reported as [`crate::generation::ExtractionDiagnostic`]
/// and contract findings as [`crate::compliance::Finding`].
#[derive(Debug, Error)]
pub enum Error {
    /// The prompt cannot be shrunk under the context budget
    #[error(
        "Prompt budget exhausted: {token_count} tokens still exceed the budget of {budget} with {topk} document(s) at 1 word each"
    )]
    BudgetExhausted {
        token_count: usize,
        budget: usize,
        topk: usize,
    },

    /// Caller supplied arguments that cannot be processed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed topic file
    #[error("Failed to parse topic file at line {line}: {message}")]
    TopicFile { line: usize, message: String },

    /// Tokenizer could not be loaded or failed to encode
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Generator collaborator failure
    #[error("Generator error: {0}")]
    Generator(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid regular expression
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a topic file error
    pub fn topic_file(line: usize, message: impl Into<String>) -> Self {
        Self::TopicFile {
            line,
            message: message.into(),
        }
    }

    /// Create a tokenizer error
    pub fn tokenizer(message: impl Into<String>) -> Self {
        Self::Tokenizer(message.into())
    }

    /// Create a generator error
    pub fn generator(message: impl Into<String>) -> Self {
        Self::Generator(message.into())
    }

    /// Whether retrying with fewer documents could succeed
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, Error::BudgetExhausted { .. })
    }
}
