//! Retrieved documents and the identifiers shared with the wire format

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier that may arrive as a JSON string or integer
///
/// Topic ids are `"2024-105741"` in one track and `42` in another; document ids
/// are usually strings. Both must survive a read/write cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Integer id
    Int(i64),
    /// String id
    Str(String),
}

/// Document identifier as written to `references`
pub type DocId = Identifier;

/// Topic identifier as written to `topic_id`
pub type TopicId = Identifier;

impl Identifier {
    /// Key used for lookups that must treat `7` and `"7"` alike
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(id) => write!(f, "{}", id),
            Identifier::Str(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Str(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Str(value)
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Int(value)
    }
}

/// A retrieved passage, immutable for the lifetime of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id, copied into `references` when cited
    pub id: DocId,
    /// Optional title, prepended to the body in prompts
    #[serde(default)]
    pub title: Option<String>,
    /// Passage text
    pub body: String,
}

impl Document {
    /// Create a document without a title
    pub fn new(id: impl Into<DocId>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            body: body.into(),
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Text shown to the generator before normalization
    pub fn prompt_content(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => {
                format!("Title: {} Content: {}", title, self.body)
            }
            _ => self.body.clone(),
        }
    }
}
