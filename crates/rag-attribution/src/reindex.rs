//! Reference list compaction
//!
//! After extraction an answer may cite only a few of the documents it was
//! offered. Reindexing caps each sentence's citations, keeps only the cited
//! references and rewrites citation ids so they stay contiguous.

use std::collections::{BTreeSet, HashMap};

use crate::types::{Answer, CitedSentence, DocId, TopicId};

/// Caps citations per sentence and removes unused references
#[derive(Debug, Clone, Copy)]
pub struct ReferenceReindexer {
    max_citations_per_sentence: usize,
}

impl Default for ReferenceReindexer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ReferenceReindexer {
    pub fn new(max_citations_per_sentence: usize) -> Self {
        Self {
            max_citations_per_sentence,
        }
    }

    /// Build an answer whose references are exactly the cited documents
    ///
    /// Citations past the per-sentence cap are dropped first, then any
    /// citation with no matching reference. Running this on its own output
    /// changes nothing.
    pub fn reindex(
        &self,
        topic_id: impl Into<TopicId>,
        topic: impl Into<String>,
        mut sentences: Vec<CitedSentence>,
        references: &[DocId],
    ) -> Answer {
        for (idx, sentence) in sentences.iter_mut().enumerate() {
            sentence.citations.truncate(self.max_citations_per_sentence);
            let before = sentence.citations.len();
            sentence.citations.retain(|&c| c < references.len());
            if sentence.citations.len() != before {
                tracing::warn!(
                    sentence = idx,
                    dropped = before - sentence.citations.len(),
                    references = references.len(),
                    "Dropped citations without a matching reference"
                );
            }
        }

        let used: BTreeSet<usize> = sentences
            .iter()
            .flat_map(|s| s.citations.iter().copied())
            .collect();
        let remap: HashMap<usize, usize> = used
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, new))
            .collect();
        let new_references: Vec<DocId> = used.iter().map(|&i| references[i].clone()).collect();

        for sentence in &mut sentences {
            for citation in &mut sentence.citations {
                *citation = remap[&*citation];
            }
        }

        if new_references.len() < references.len() {
            tracing::debug!(
                kept = new_references.len(),
                removed = references.len() - new_references.len(),
                "Removed uncited references"
            );
        }

        Answer::new(topic_id, topic, new_references, sentences)
    }

    /// Reindex an existing answer in place of its current references
    pub fn reindex_answer(&self, answer: Answer) -> Answer {
        let Answer {
            topic_id,
            topic,
            references,
            sentences,
            ..
        } = answer;
        self.reindex(topic_id, topic, sentences, &references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn refs(ids: &[&str]) -> Vec<DocId> {
        ids.iter().map(|&id| DocId::from(id)).collect()
    }

    #[test]
    fn test_compacts_references() {
        let sentences = vec![
            CitedSentence::new("first", vec![0, 3]),
            CitedSentence::new("second", vec![3]),
        ];
        let answer =
            ReferenceReindexer::default().reindex("1", "t", sentences, &refs(&["a", "b", "c", "d"]));

        assert_eq!(answer.references, refs(&["a", "d"]));
        assert_eq!(answer.sentences[0].citations, vec![0, 1]);
        assert_eq!(answer.sentences[1].citations, vec![1]);
        assert!(answer.is_consistent());
    }

    #[test]
    fn test_caps_before_collecting() {
        let sentences = vec![CitedSentence::new("s", vec![4, 2, 0, 1])];
        let answer = ReferenceReindexer::new(2).reindex(
            "1",
            "t",
            sentences,
            &refs(&["a", "b", "c", "d", "e"]),
        );
        assert_eq!(answer.references, refs(&["c", "e"]));
        assert_eq!(answer.sentences[0].citations, vec![1, 0]);
    }

    #[test]
    fn test_out_of_range_dropped() {
        let sentences = vec![CitedSentence::new("s", vec![1, 7])];
        let answer = ReferenceReindexer::default().reindex("1", "t", sentences, &refs(&["a", "b"]));
        assert_eq!(answer.references, refs(&["b"]));
        assert_eq!(answer.sentences[0].citations, vec![0]);
    }

    #[test]
    fn test_uncited_answer_has_no_references() {
        let sentences = vec![CitedSentence::uncited("nothing cited")];
        let answer = ReferenceReindexer::default().reindex("1", "t", sentences, &refs(&["a"]));
        assert!(answer.references.is_empty());
        assert_eq!(answer.response_length, 2);
    }

    fn sentences_strategy() -> impl Strategy<Value = (Vec<CitedSentence>, usize)> {
        (1usize..12).prop_flat_map(|n_refs| {
            let sentence = (
                "[a-z]{1,8}( [a-z]{1,8}){0,5}",
                prop::collection::vec(0..n_refs + 2, 0..6),
            )
                .prop_map(|(text, citations)| CitedSentence::new(text, citations));
            (prop::collection::vec(sentence, 0..8), Just(n_refs))
        })
    }

    proptest! {
        #[test]
        fn prop_reindex_is_idempotent((sentences, n_refs) in sentences_strategy(), cap in 1usize..5) {
            let references: Vec<DocId> = (0..n_refs).map(|i| DocId::from(format!("d{}", i))).collect();
            let reindexer = ReferenceReindexer::new(cap);
            let once = reindexer.reindex("1", "t", sentences, &references);
            let twice = reindexer.reindex_answer(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_output_is_consistent((sentences, n_refs) in sentences_strategy()) {
            let references: Vec<DocId> = (0..n_refs).map(|i| DocId::from(format!("d{}", i))).collect();
            let answer = ReferenceReindexer::default().reindex("1", "t", sentences, &references);
            prop_assert!(answer.is_consistent());
            for sentence in &answer.sentences {
                prop_assert!(sentence.citations.len() <= 3);
            }
        }
    }
}
