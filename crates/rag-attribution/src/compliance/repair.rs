//! Mutating pass applying the repairs requested by warnings

use std::collections::HashSet;

use super::finding::Repair;
use crate::types::{AnswerRecord, RecordCitation, RecordSentence};

/// Pop trailing items while their total word count exceeds `limit`
///
/// Returns the removed items, last sentence first. Stops early when nothing
/// is left, so it always terminates.
pub fn trim_from_end<T, F>(items: &mut Vec<T>, limit: usize, words: F) -> Vec<T>
where
    F: Fn(&T) -> usize,
{
    let mut length: usize = items.iter().map(&words).sum();
    let mut removed = Vec::new();
    while length > limit {
        let Some(last) = items.pop() else { break };
        length -= words(&last);
        removed.push(last);
    }
    removed
}

/// Apply `repairs` in a fixed order and report whether the record changed
///
/// Sentence-level fixes run first, then trimming, then the length rewrite,
/// so `response_length` always matches the surviving sentences. Records
/// without a `response_length` only get one when a repair asks for it.
/// `narrative` is the official topic text used to fill `metadata.narrative`.
pub fn apply_repairs(
    record: &mut AnswerRecord,
    repairs: &[Repair],
    response_limit: usize,
    narrative: Option<&str>,
) -> bool {
    let before = record.clone();
    let references = record.references.clone().unwrap_or_default();

    if let Some(sentences) = record.answer.as_mut() {
        for repair in repairs {
            match *repair {
                Repair::DropOutOfRange { sentence } => {
                    if let Some(citations) = sentence_citations(sentences, sentence) {
                        let dropped: Vec<RecordCitation> = citations
                            .iter()
                            .filter(|c| c.resolve(&references).is_none())
                            .cloned()
                            .collect();
                        citations.retain(|c| c.resolve(&references).is_some());
                        tracing::warn!(sentence, ?dropped, "Dropped out-of-range citations");
                    }
                }
                Repair::DedupeCitations { sentence } => {
                    if let Some(citations) = sentence_citations(sentences, sentence) {
                        let mut seen = HashSet::new();
                        citations.retain(|c| seen.insert(c.clone()));
                        tracing::warn!(sentence, "Removed duplicate citations");
                    }
                }
                Repair::TrimFromEnd | Repair::SetResponseLength | Repair::FillNarrative => {}
            }
        }

        if repairs.contains(&Repair::TrimFromEnd) {
            let removed = trim_from_end(sentences, response_limit, RecordSentence::word_count);
            for sentence in &removed {
                tracing::warn!(
                    text = sentence.text.as_deref().unwrap_or_default(),
                    "Removing a sentence from the end"
                );
            }
        }
    }

    if repairs.contains(&Repair::FillNarrative) {
        if let (Some(metadata), Some(text)) = (record.metadata.as_mut(), narrative) {
            if metadata.narrative.is_none() {
                metadata.narrative = Some(text.to_string());
                tracing::warn!("Added missing metadata.narrative");
            }
        }
    }

    let rewrite_length = repairs.contains(&Repair::SetResponseLength)
        || (repairs.contains(&Repair::TrimFromEnd) && record.response_length.is_some());
    if rewrite_length {
        let length = record.computed_length();
        tracing::warn!(
            reported = ?record.response_length,
            actual = length,
            "Updated response_length"
        );
        record.response_length = Some(length as i64);
    }

    *record != before
}

fn sentence_citations(
    sentences: &mut [RecordSentence],
    idx: usize,
) -> Option<&mut Vec<RecordCitation>> {
    sentences.get_mut(idx)?.citations.as_mut()
}
