//! Attributed answers in the shape consumed by downstream scorers

use serde::{Deserialize, Serialize};
use std::io::Write;

use super::document::{DocId, TopicId};
use crate::error::Result;
use crate::text::word_count;

/// One answer sentence and the reference indices supporting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedSentence {
    /// Sentence text with citation markers removed
    pub text: String,
    /// Indices into the answer's `references`, most relevant first
    #[serde(default)]
    pub citations: Vec<usize>,
}

impl CitedSentence {
    /// Create a cited sentence
    pub fn new(text: impl Into<String>, citations: Vec<usize>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }

    /// Create a sentence without citations
    pub fn uncited(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// Word count of this sentence
    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }

    /// Whether any citation repeats
    pub fn has_duplicate_citations(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        !self.citations.iter().all(|c| seen.insert(*c))
    }
}

/// A finished answer for one topic
///
/// Serializes to `{"topic_id", "topic", "references", "response_length", "answer"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub topic_id: TopicId,
    /// Topic text
    pub topic: String,
    /// Index `i` is the document cited as `i`
    pub references: Vec<DocId>,
    /// Word count of all sentence text
    pub response_length: usize,
    /// Cited sentences, in answer order
    #[serde(rename = "answer")]
    pub sentences: Vec<CitedSentence>,
}

impl Answer {
    /// Create an answer, computing `response_length` from the sentences
    pub fn new(
        topic_id: impl Into<TopicId>,
        topic: impl Into<String>,
        references: Vec<DocId>,
        sentences: Vec<CitedSentence>,
    ) -> Self {
        let mut answer = Self {
            topic_id: topic_id.into(),
            topic: topic.into(),
            references,
            response_length: 0,
            sentences,
        };
        answer.recompute_length();
        answer
    }

    /// Recompute `response_length` from the current sentences
    pub fn recompute_length(&mut self) -> usize {
        self.response_length = self.sentences.iter().map(CitedSentence::word_count).sum();
        self.response_length
    }

    /// Every citation is a valid index and every reference is cited
    pub fn is_consistent(&self) -> bool {
        let mut used = vec![false; self.references.len()];
        for sentence in &self.sentences {
            for &citation in &sentence.citations {
                match used.get_mut(citation) {
                    Some(slot) => *slot = true,
                    None => return false,
                }
            }
        }
        used.into_iter().all(|u| u)
    }

    /// Full answer text, sentences joined by a space
    pub fn text(&self) -> String {
        self.sentences
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Write answers one JSON object per line
pub fn write_jsonl<W: Write>(answers: &[Answer], mut writer: W) -> Result<()> {
    for answer in answers {
        serde_json::to_writer(&mut writer, answer)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write answers as a single pretty-printed JSON array
pub fn write_json<W: Write>(answers: &[Answer], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, answers)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Answer {
        Answer::new(
            "2024-001",
            "what is rust",
            vec![DocId::from("a"), DocId::from("b")],
            vec![
                CitedSentence::new("Rust is a language.", vec![0]),
                CitedSentence::new("It is fast.", vec![1, 0]),
            ],
        )
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        let mut keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["answer", "references", "response_length", "topic", "topic_id"]
        );
        assert_eq!(json["response_length"], 7);
        assert_eq!(json["answer"][1]["citations"], serde_json::json!([1, 0]));
    }

    #[test]
    fn test_consistency() {
        let mut answer = sample();
        assert!(answer.is_consistent());

        answer.sentences[1].citations = vec![2];
        assert!(!answer.is_consistent());

        answer.sentences[1].citations = vec![0];
        assert!(!answer.is_consistent(), "reference b is no longer cited");
    }

    #[test]
    fn test_duplicate_detection() {
        assert!(CitedSentence::new("x", vec![1, 2, 1]).has_duplicate_citations());
        assert!(!CitedSentence::new("x", vec![1, 2]).has_duplicate_citations());
    }

    #[test]
    fn test_write_jsonl() {
        let mut buffer = Vec::new();
        write_jsonl(&[sample(), sample()], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with(r#"{"topic_id":"2024-001","topic":"what is rust""#));
    }
}
