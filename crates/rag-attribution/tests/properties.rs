//! Property-based tests for the attribution engine using proptest.

use proptest::prelude::*;

use rag_attribution::compliance::ComplianceValidator;
use rag_attribution::config::{BudgetConfig, ComplianceConfig, EngineConfig};
use rag_attribution::generation::{
    CitationMode, GeneratorOutput, PromptBudgetFitter, PromptTemplate,
};
use rag_attribution::text::{word_count, UnicodeSentenceSplitter, WhitespaceTokenCounter};
use rag_attribution::types::{Query, Request};
use rag_attribution::{Answer, AttributionPipeline, CitedSentence, DocId, Document};

fn words() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,10}", 1..12).prop_map(|w| w.join(" "))
}

fn documents(max: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(
        prop::collection::vec("[a-zA-Z]{1,12}", 0..300).prop_map(|w| w.join(" ")),
        1..max,
    )
    .prop_map(|bodies| {
        bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| Document::new(format!("msmarco_v2.1_doc_0_{}#0_0", i), body))
            .collect()
    })
}

// --- Budget fitter ---

proptest! {
    #[test]
    fn fitter_terminates_with_fit_or_exhaustion(
        docs in documents(12),
        topk in 1usize..15,
        context_size in 50usize..4000,
        reserved_fraction in 0.0f64..0.95,
    ) {
        let reserved = ((context_size as f64) * reserved_fraction) as usize;
        prop_assume!(context_size > reserved);
        let budget = BudgetConfig {
            context_size,
            reserved_output_tokens: reserved,
            fixed_overhead: 200,
            topk,
        };
        let fitter = PromptBudgetFitter::new(budget, PromptTemplate::default());

        match fitter.fit("a question", &docs, topk, &WhitespaceTokenCounter) {
            Ok(prompt) => {
                prop_assert!(prompt.token_count <= context_size - reserved);
                prop_assert_eq!(prompt.documents_included, topk.min(docs.len()));
            }
            Err(e) => prop_assert!(e.is_budget_exhausted()),
        }
    }
}

// --- Pipeline output invariants ---

proptest! {
    #[test]
    fn pipeline_output_is_consistent(
        sentences in prop::collection::vec(
            (words(), prop::collection::vec(0usize..12, 0..5)),
            1..30,
        ),
        n_docs in 1usize..8,
        response_limit in 5usize..120,
    ) {
        let mut config = EngineConfig::default();
        config.compliance.response_limit = response_limit;
        let pipeline = AttributionPipeline::new(config).unwrap();

        let docs: Vec<Document> = (0..n_docs)
            .map(|i| Document::new(format!("msmarco_v2.1_doc_0_{}#0_0", i), "body text"))
            .collect();
        let request = Request::new(
            Query { text: "topic".to_string(), qid: "1".into() },
            &docs,
        );
        let prompt = pipeline.prepare(&request, &WhitespaceTokenCounter).unwrap();

        // Markers are 1-based; some fall outside the prompt's documents on purpose
        let raw = sentences
            .iter()
            .map(|(text, cites)| {
                let markers: String = cites.iter().map(|c| format!(" [{}]", c)).collect();
                format!("{}{}.", text, markers)
            })
            .collect::<Vec<_>>()
            .join(" ");

        let attributed = pipeline
            .attribute(
                &request,
                &prompt,
                &GeneratorOutput::text(raw),
                CitationMode::Marker,
                &UnicodeSentenceSplitter,
            )
            .unwrap();
        let answer = &attributed.answer;

        prop_assert!(answer.is_consistent());
        prop_assert!(answer.response_length <= response_limit || answer.sentences.is_empty());
        let total: usize = answer.sentences.iter().map(|s| word_count(&s.text)).sum();
        prop_assert_eq!(answer.response_length, total);
        for sentence in &answer.sentences {
            prop_assert!(!sentence.has_duplicate_citations());
            prop_assert!(sentence.citations.len() <= 3);
        }
    }

    #[test]
    fn validator_output_has_no_duplicate_citations(
        sentences in prop::collection::vec(
            (words(), prop::collection::vec(0usize..4, 0..8)),
            0..20,
        ),
    ) {
        let references: Vec<DocId> = (0..4)
            .map(|i| DocId::from(format!("msmarco_v2.1_doc_0_{}#0_0", i)))
            .collect();
        let sentences = sentences
            .into_iter()
            .map(|(text, citations)| CitedSentence::new(text, citations))
            .collect();
        let answer = Answer::new("1", "topic", references, sentences);

        let validator = ComplianceValidator::new(&ComplianceConfig::default()).unwrap();
        let (repaired, report) = validator.validate(&answer, "topic").unwrap();

        prop_assert!(report.is_accepted());
        for sentence in &repaired.sentences {
            prop_assert!(!sentence.has_duplicate_citations());
        }
    }
}
