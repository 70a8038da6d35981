//! Loosely-typed run file records, as submitted for validation
//!
//! Every field is optional so that a missing field becomes a reported
//! contract violation instead of a parse failure. Keys the validator does not
//! know about are carried through to the fixed output untouched.
//!
//! Two layouts are accepted. The 2024 layout carries `run_id`, `topic_id`,
//! `topic` and `response_length` at the top level; the 2025 layout moves run
//! and topic information into a `metadata` object and drops `response_length`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::answer::{Answer, CitedSentence};
use super::document::{DocId, TopicId};
use crate::error::{Error, Result};
use crate::text::word_count;

/// Used by [`AnswerRecord::to_trec25`] when a record has no answer at all
pub const PLACEHOLDER_ANSWER: &str = "No answer content available in the original record.";

/// One line of a run file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RunMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<TopicId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<DocId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Vec<RecordSentence>>,
    /// Unrecognized keys, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Run and topic description of a 2025-layout record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// `manual` or `automatic`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub run_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_id: Option<TopicId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One answer sentence as submitted; citations may be negative or out of range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSentence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<RecordCitation>>,
}

/// A submitted citation: a position in `references` or a segment id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordCitation {
    Index(i64),
    Segment(String),
}

impl RecordCitation {
    /// Position in `references` this citation points at, if any
    pub fn resolve(&self, references: &[DocId]) -> Option<usize> {
        match self {
            RecordCitation::Index(index) => usize::try_from(*index)
                .ok()
                .filter(|&index| index < references.len()),
            RecordCitation::Segment(id) => references.iter().position(|r| r.key() == *id),
        }
    }
}

impl From<i64> for RecordCitation {
    fn from(index: i64) -> Self {
        RecordCitation::Index(index)
    }
}

impl From<&str> for RecordCitation {
    fn from(id: &str) -> Self {
        RecordCitation::Segment(id.to_string())
    }
}

impl fmt::Display for RecordCitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordCitation::Index(index) => write!(f, "{}", index),
            RecordCitation::Segment(id) => write!(f, "{}", id),
        }
    }
}

impl RecordSentence {
    /// Word count of the sentence text, zero when absent
    pub fn word_count(&self) -> usize {
        self.text.as_deref().map(word_count).unwrap_or(0)
    }
}

impl AnswerRecord {
    /// Parse a single JSON line
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Word count over all sentences, ignoring `response_length`
    pub fn computed_length(&self) -> usize {
        self.answer
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(RecordSentence::word_count)
            .sum()
    }

    /// Topic id from the top level or, for 2025 records, `metadata.narrative_id`
    pub fn effective_topic_id(&self) -> Option<&TopicId> {
        self.topic_id
            .as_ref()
            .or_else(|| self.metadata.as_ref()?.narrative_id.as_ref())
    }

    /// Topic text from the top level or `metadata.narrative`
    pub fn effective_topic(&self) -> Option<&str> {
        self.topic
            .as_deref()
            .or_else(|| self.metadata.as_ref()?.narrative.as_deref())
    }

    /// Run id from the top level or `metadata.run_id`
    pub fn effective_run_id(&self) -> Option<&str> {
        self.run_id
            .as_deref()
            .or_else(|| self.metadata.as_ref()?.run_id.as_deref())
    }

    /// Rewrite a 2024-layout record into the 2025 layout
    ///
    /// `team_id` and `type` are taken from extra top-level keys when present,
    /// otherwise `organizer` and `automatic`. Other extra keys and
    /// `response_length` are dropped. A record without sentences gets a single
    /// uncited placeholder sentence.
    pub fn to_trec25(&self, prompt: Option<&str>) -> AnswerRecord {
        let previous = self.metadata.clone().unwrap_or_default();
        let extra_str = |key: &str| self.extra.get(key).and_then(Value::as_str).map(str::to_string);

        let metadata = RunMetadata {
            team_id: extra_str("team_id")
                .or(previous.team_id)
                .or_else(|| Some("organizer".to_string())),
            run_id: self
                .effective_run_id()
                .map(str::to_string)
                .or_else(|| Some("unknown-run".to_string())),
            run_type: extra_str("type")
                .or(previous.run_type)
                .or_else(|| Some("automatic".to_string())),
            narrative_id: self
                .effective_topic_id()
                .cloned()
                .or_else(|| Some(TopicId::from(1i64))),
            narrative: Some(self.effective_topic().unwrap_or_default().to_string()),
            prompt: prompt.map(Value::from).or(previous.prompt),
            extra: Map::new(),
        };

        let answer = match self.answer.as_deref() {
            Some(sentences) if !sentences.is_empty() => sentences.to_vec(),
            _ => vec![RecordSentence {
                text: Some(PLACEHOLDER_ANSWER.to_string()),
                citations: Some(Vec::new()),
            }],
        };

        AnswerRecord {
            metadata: Some(metadata),
            references: Some(self.references.clone().unwrap_or_default()),
            answer: Some(answer),
            ..Default::default()
        }
    }

    /// Convert into a strongly-typed answer
    ///
    /// Fails when a required field is missing, an index citation is negative
    /// or a segment citation is not among the references.
    /// `response_length` is always recomputed.
    pub fn to_answer(&self) -> Result<Answer> {
        let topic_id = self
            .effective_topic_id()
            .cloned()
            .ok_or_else(|| Error::invalid_input("record is missing \"topic_id\""))?;
        let topic = self
            .effective_topic()
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_input("record is missing \"topic\""))?;
        let references = self
            .references
            .clone()
            .ok_or_else(|| Error::invalid_input("record is missing \"references\""))?;
        let raw_sentences = self
            .answer
            .as_ref()
            .ok_or_else(|| Error::invalid_input("record is missing \"answer\""))?;

        let mut sentences = Vec::with_capacity(raw_sentences.len());
        for (idx, sentence) in raw_sentences.iter().enumerate() {
            let text = sentence.text.clone().ok_or_else(|| {
                Error::invalid_input(format!("answer[{}].text missing", idx))
            })?;
            let citations = sentence
                .citations
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|citation| match citation {
                    RecordCitation::Index(index) => usize::try_from(*index).map_err(|_| {
                        Error::invalid_input(format!(
                            "answer[{}] has negative citation {}",
                            idx, index
                        ))
                    }),
                    RecordCitation::Segment(_) => citation.resolve(&references).ok_or_else(|| {
                        Error::invalid_input(format!(
                            "answer[{}] cites {} which is not in references",
                            idx, citation
                        ))
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            sentences.push(CitedSentence::new(text, citations));
        }

        Ok(Answer::new(topic_id, topic, references, sentences))
    }
}

impl From<&Answer> for AnswerRecord {
    fn from(answer: &Answer) -> Self {
        Self {
            metadata: None,
            run_id: None,
            topic_id: Some(answer.topic_id.clone()),
            topic: Some(answer.topic.clone()),
            references: Some(answer.references.clone()),
            response_length: Some(answer.response_length as i64),
            answer: Some(
                answer
                    .sentences
                    .iter()
                    .map(|s| RecordSentence {
                        text: Some(s.text.clone()),
                        citations: Some(
                            s.citations
                                .iter()
                                .map(|&c| RecordCitation::Index(c as i64))
                                .collect(),
                        ),
                    })
                    .collect(),
            ),
            extra: Map::new(),
        }
    }
}
