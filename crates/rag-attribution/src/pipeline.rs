//! End-to-end attribution for one request
//!
//! `prepare` builds the prompt, the caller (or [`AttributionPipeline::run`])
//! calls the generator, and `attribute` turns the raw output into a validated
//! answer. The pipeline holds only configuration, so one instance can serve
//! concurrent requests.

use crate::compliance::{ComplianceValidator, ValidationReport};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::generation::{
    CitationMode, CitationStrategy, ExtractionDiagnostic, FittedPrompt, Generator,
    GeneratorOutput, PromptBudgetFitter, PromptTemplate,
};
use crate::reindex::ReferenceReindexer;
use crate::text::{SentenceSplitter, TokenCounter};
use crate::types::{Answer, ExecRecord, ExecSummary, Request};

/// A validated answer plus everything noticed on the way
#[derive(Debug, Clone)]
pub struct Attributed {
    pub answer: Answer,
    pub report: ValidationReport,
    pub diagnostics: Vec<ExtractionDiagnostic>,
    /// Prompt and raw response that produced `answer`
    pub exec_summary: ExecSummary,
}

impl Attributed {
    pub fn is_accepted(&self) -> bool {
        self.report.is_accepted()
    }

    /// Execution summary line for this request
    pub fn exec_record(&self, request: &Request) -> ExecRecord {
        ExecRecord {
            query: request.query.clone(),
            rag_exec_summary: self.exec_summary.clone(),
        }
    }
}

/// Prompt fitting, citation extraction, reindexing and validation
#[derive(Debug, Clone)]
pub struct AttributionPipeline {
    config: EngineConfig,
    fitter: PromptBudgetFitter,
    reindexer: ReferenceReindexer,
    validator: ComplianceValidator,
}

impl AttributionPipeline {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let fitter = PromptBudgetFitter::new(
            config.budget.clone(),
            PromptTemplate::from_config(&config.prompt),
        );
        let reindexer = ReferenceReindexer::new(config.citations.max_per_sentence);
        let validator = ComplianceValidator::new(&config.compliance)?;
        Ok(Self {
            config,
            fitter,
            reindexer,
            validator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fit the request's top candidates into the context budget
    pub fn prepare<C>(&self, request: &Request, counter: &C) -> Result<FittedPrompt>
    where
        C: TokenCounter + ?Sized,
    {
        let topk = self.config.budget.topk;
        let documents = request.documents(topk);
        self.fitter.fit(&request.query.text, &documents, topk, counter)
    }

    /// Strategy for a backend's citation mode
    pub fn strategy(
        &self,
        mode: CitationMode,
        output: &GeneratorOutput,
        documents: usize,
    ) -> CitationStrategy {
        match mode {
            CitationMode::Span => {
                let spans = output.spans.clone().unwrap_or_else(|| {
                    tracing::warn!("Span citation mode but the generator returned no spans");
                    Vec::new()
                });
                CitationStrategy::span(spans)
            }
            CitationMode::Marker => CitationStrategy::marker(documents),
        }
    }

    /// Turn raw generator output into a validated answer
    ///
    /// References are the candidates that were rendered into `prompt`; a
    /// prompt without documents yields an answer without citations. When
    /// validation trims sentences the answer is reindexed again, so no
    /// uncited reference survives.
    pub fn attribute<S>(
        &self,
        request: &Request,
        prompt: &FittedPrompt,
        output: &GeneratorOutput,
        mode: CitationMode,
        splitter: &S,
    ) -> Result<Attributed>
    where
        S: SentenceSplitter + ?Sized,
    {
        let references = request.references(prompt.documents_included);
        let strategy = self.strategy(mode, output, references.len());
        let extraction = strategy.extract(&output.text, splitter);

        let answer = self.reindexer.reindex(
            request.query.qid.clone(),
            request.query.text.clone(),
            extraction.sentences,
            &references,
        );
        let (mut answer, report) = self.validator.validate(&answer, &request.query.text)?;
        if report.repaired {
            answer = self.reindexer.reindex_answer(answer);
        }

        tracing::debug!(
            topic_id = %answer.topic_id,
            sentences = answer.sentences.len(),
            references = answer.references.len(),
            response_length = answer.response_length,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Attributed answer"
        );

        Ok(Attributed {
            answer,
            report,
            diagnostics: extraction.diagnostics,
            exec_summary: ExecSummary {
                prompt: prompt.text.clone(),
                response: output.text.clone(),
                input_token_count: prompt.token_count,
                candidates: references,
            },
        })
    }

    /// Prepare, generate and attribute in one call
    pub async fn run<G, C, S>(
        &self,
        request: &Request,
        generator: &G,
        counter: &C,
        splitter: &S,
    ) -> Result<Attributed>
    where
        G: Generator + ?Sized,
        C: TokenCounter + ?Sized,
        S: SentenceSplitter + ?Sized,
    {
        let prompt = self.prepare(request, counter)?;
        tracing::info!(
            generator = generator.name(),
            model = %generator.profile().model,
            tokens = prompt.token_count,
            documents = prompt.documents_included,
            "Generating answer"
        );
        let output = generator.generate(&prompt).await?;
        self.attribute(
            request,
            &prompt,
            &output,
            generator.profile().citation_mode,
            splitter,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{UnicodeSentenceSplitter, WhitespaceTokenCounter};
    use crate::types::{DocId, Document, Query, TopicId};

    fn request() -> Request {
        let documents: Vec<Document> = (1..=4)
            .map(|i| {
                Document::new(
                    format!("msmarco_v2.1_doc_0_{}#0_0", i),
                    format!("Passage {}", i),
                )
            })
            .collect();
        Request::new(
            Query {
                text: "when did the war begin".to_string(),
                qid: "2024-001".into(),
            },
            &documents,
        )
    }

    #[test]
    fn test_marker_attribution() {
        let pipeline = AttributionPipeline::new(EngineConfig::default()).unwrap();
        let request = request();
        let prompt = pipeline.prepare(&request, &WhitespaceTokenCounter).unwrap();
        assert_eq!(prompt.documents_included, 4);

        let output = GeneratorOutput::text("The war began in 1939 [4]. It ended in 1945 [2] [4].");
        let attributed = pipeline
            .attribute(
                &request,
                &prompt,
                &output,
                CitationMode::Marker,
                &UnicodeSentenceSplitter,
            )
            .unwrap();

        let answer = &attributed.answer;
        assert!(attributed.is_accepted());
        assert_eq!(
            answer.references,
            vec![
                DocId::from("msmarco_v2.1_doc_0_2#0_0"),
                DocId::from("msmarco_v2.1_doc_0_4#0_0")
            ]
        );
        assert_eq!(answer.sentences[0].citations, vec![1]);
        assert_eq!(answer.sentences[1].citations, vec![0, 1]);
        assert!(answer.is_consistent());

        let exec = attributed.exec_record(&request);
        assert_eq!(exec.query.qid, TopicId::from("2024-001"));
        assert_eq!(exec.rag_exec_summary.prompt, prompt.text);
        assert_eq!(exec.rag_exec_summary.response, output.text);
        assert_eq!(exec.rag_exec_summary.input_token_count, prompt.token_count);
        assert_eq!(exec.rag_exec_summary.candidates.len(), 4);
    }

    #[test]
    fn test_no_cite_prompt_attributes_nothing() {
        let mut config = EngineConfig::default();
        config.prompt.mode = crate::generation::PromptMode::RagnarokV4NoCite;
        let pipeline = AttributionPipeline::new(config).unwrap();
        let request = request();
        let prompt = pipeline.prepare(&request, &WhitespaceTokenCounter).unwrap();
        assert_eq!(prompt.documents_included, 0);

        let output = GeneratorOutput::text("The war began in 1939 [1].");
        let attributed = pipeline
            .attribute(
                &request,
                &prompt,
                &output,
                CitationMode::Marker,
                &UnicodeSentenceSplitter,
            )
            .unwrap();
        assert!(attributed.answer.references.is_empty());
        assert!(attributed.answer.sentences[0].citations.is_empty());
        assert!(attributed.exec_summary.candidates.is_empty());
    }

    #[test]
    fn test_span_mode_without_spans() {
        let pipeline = AttributionPipeline::new(EngineConfig::default()).unwrap();
        let request = request();
        let prompt = pipeline.prepare(&request, &WhitespaceTokenCounter).unwrap();

        let output = GeneratorOutput::text("Uncited text.");
        let attributed = pipeline
            .attribute(
                &request,
                &prompt,
                &output,
                CitationMode::Span,
                &UnicodeSentenceSplitter,
            )
            .unwrap();
        assert!(attributed.answer.references.is_empty());
        assert!(attributed.answer.sentences[0].citations.is_empty());
    }
}
