//! Prompt templates and context-budget fitting

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{BudgetConfig, PromptConfig};
use crate::error::{Error, Result};
use crate::text::{escape_citation_markers, normalize_snippet, truncate_words, TokenCounter};
use crate::types::Document;

const SYSTEM_MESSAGE: &str = "This is a chat between a user and an artificial intelligence assistant. The assistant gives helpful and detailed answers to the user's question based on the context references. The assistant should also indicate when the answer cannot be found in the context references.";

const SYSTEM_MESSAGE_NO_CITE: &str = "This is a chat between a user and an artificial intelligence assistant. The assistant gives helpful and detailed answers to the user's question.";

const SYSTEM_MESSAGE_CHATQA: &str = "System: This is a chat between a user and an artificial intelligence assistant. The assistant gives helpful, detailed, and polite answers to the user's questions based on the context. The assistant should also indicate when the answer cannot be found in the context.";

/// Instruction set used when prompting the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Sentence-level IEEE citations, at most three per sentence
    RagnarokV2,
    /// Adds a 380-word ceiling
    RagnarokV3,
    /// Adds coherence and uncertainty guidance
    #[default]
    RagnarokV4,
    /// Same as v4 without citations or references
    RagnarokV4NoCite,
    /// ChatQA layout: context block first, then the user turn
    Chatqa,
}

impl PromptMode {
    /// Instruction text for this mode
    pub fn instruction(&self) -> &'static str {
        match self {
            PromptMode::RagnarokV2 => concat!(
                "Please give a full and complete answer for the question. ",
                "Cite each context document inline that supports your answer within brackets [] using the IEEE format. ",
                "Each sentence should have at most three citations. ",
                "Order the citations in decreasing order of importance. ",
                "Never include or mention anything about references, this is already provided, just answer the question such that each sentence has one or more sentence-level citations and say nothing else."
            ),
            PromptMode::RagnarokV3 => concat!(
                "Provide a concise, information-dense answer to the question. ",
                "Your response must not exceed 380 words under any circumstances. ",
                "Prioritize the most relevant and impactful information within this strict limit. ",
                "Cite supporting context documents inline using IEEE format in square brackets []. ",
                "Include 1-3 citations per sentence, ordered by decreasing importance. ",
                "Ensure each sentence has at least one citation. ",
                "Focus solely on answering the question with properly cited information. ",
                "Avoid mentioning references or providing any meta-commentary about the answering process."
            ),
            PromptMode::RagnarokV4 | PromptMode::Chatqa => concat!(
                "Provide a concise, information-dense answer to the question. ",
                "Your response must not exceed 380 words under any circumstances. ",
                "Prioritize the most relevant and impactful information within this strict limit. ",
                "Ensure your answer directly addresses the question and maintains coherence throughout. ",
                "Cite supporting context documents inline using IEEE format in square brackets []. ",
                "Include 1-3 citations per sentence, ordered by decreasing importance. ",
                "Ensure each sentence has at least one citation. ",
                "Use multiple sources to provide a well-rounded answer when possible. ",
                "If sources contradict each other, acknowledge this and explain the discrepancy. ",
                "Express uncertainty when appropriate rather than making unfounded claims. ",
                "Prioritize factual accuracy and avoid speculation. ",
                "Focus solely on answering the question with properly cited information. ",
                "Avoid mentioning references or providing any meta-commentary about the answering process."
            ),
            PromptMode::RagnarokV4NoCite => concat!(
                "Provide a concise, information-dense answer to the question. ",
                "Your response must not exceed 380 words under any circumstances. ",
                "Prioritize the most relevant and impactful information within this strict limit. ",
                "Ensure your answer directly addresses the question and maintains coherence throughout. ",
                "Provide a well-rounded answer when possible. ",
                "Express uncertainty when appropriate rather than making unfounded claims. ",
                "Prioritize factual accuracy and avoid speculation. ",
                "Focus solely on answering the question. ",
                "Avoid references or providing any meta-commentary about the answering process."
            ),
        }
    }

    /// Whether documents are shown to the generator at all
    pub fn includes_references(&self) -> bool {
        !matches!(self, PromptMode::RagnarokV4NoCite)
    }

    fn default_system_message(&self) -> &'static str {
        match self {
            PromptMode::RagnarokV4NoCite => SYSTEM_MESSAGE_NO_CITE,
            PromptMode::Chatqa => SYSTEM_MESSAGE_CHATQA,
            _ => SYSTEM_MESSAGE,
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptMode::RagnarokV2 => write!(f, "ragnarok_v2"),
            PromptMode::RagnarokV3 => write!(f, "ragnarok_v3"),
            PromptMode::RagnarokV4 => write!(f, "ragnarok_v4"),
            PromptMode::RagnarokV4NoCite => write!(f, "ragnarok_v4_no_cite"),
            PromptMode::Chatqa => write!(f, "chatqa"),
        }
    }
}

/// Renders the query and numbered snippets into prompt text
#[derive(Debug, Clone, Default)]
pub struct PromptTemplate {
    mode: PromptMode,
    system_message: Option<String>,
}

impl PromptTemplate {
    /// Create a template for a mode with its default system message
    pub fn new(mode: PromptMode) -> Self {
        Self {
            mode,
            system_message: None,
        }
    }

    /// Create a template from configuration
    pub fn from_config(config: &PromptConfig) -> Self {
        Self {
            mode: config.mode,
            system_message: config.system_message.clone(),
        }
    }

    /// The active prompt mode
    pub fn mode(&self) -> PromptMode {
        self.mode
    }

    fn system_message(&self) -> &str {
        self.system_message
            .as_deref()
            .unwrap_or_else(|| self.mode.default_system_message())
    }

    /// Render the full prompt from already-normalized snippets
    pub fn render(&self, query: &str, snippets: &[String]) -> String {
        let instruction = self.mode.instruction();
        let references = snippets
            .iter()
            .enumerate()
            .map(|(i, snippet)| format!("[{}] {}", i + 1, snippet))
            .collect::<Vec<_>>()
            .join("\n");

        match self.mode {
            PromptMode::RagnarokV4NoCite => format!(
                "{system}\n\nInstruction: {instruction}\nQuery: {query}\nInstruction: {instruction}",
                system = self.system_message(),
                instruction = instruction,
                query = query,
            ),
            PromptMode::Chatqa => format!(
                "{system}\n\nContext: {references}\n\nUser: Query: {query}\nInstruction: {instruction}\n\nAssistant:",
                system = self.system_message(),
                references = references,
                query = query,
                instruction = instruction,
            ),
            _ => format!(
                "{system}\n\nInstruction: {instruction}\nThe following are context references from which you can cite the identifier. References: {references}\nQuery: {query}\nInstruction: {instruction}",
                system = self.system_message(),
                instruction = instruction,
                references = references,
                query = query,
            ),
        }
    }
}

/// A prompt that fits the context budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedPrompt {
    /// Prompt text
    pub text: String,
    /// Tokens as measured by the backend's counter
    pub token_count: usize,
    /// Per-document word cap that produced this prompt
    pub max_length_words: usize,
    /// Number of documents rendered; citation `i` refers to document `i`
    pub documents_included: usize,
}

/// Shrinks per-document snippets until the prompt fits the context window
///
/// Word counts only approximate real token counts, so the prompt is rendered,
/// measured with the backend's counter and rebuilt with shorter snippets until
/// it fits or every snippet is down to a single word.
#[derive(Debug, Clone)]
pub struct PromptBudgetFitter {
    budget: BudgetConfig,
    template: PromptTemplate,
}

impl PromptBudgetFitter {
    /// Create a fitter
    pub fn new(budget: BudgetConfig, template: PromptTemplate) -> Self {
        Self { budget, template }
    }

    /// Tokens available to the prompt
    pub fn prompt_budget(&self) -> usize {
        self.budget.prompt_budget()
    }

    /// Normalized snippet for one document, capped at `max_length` words
    pub fn snippet(document: &Document, max_length: usize) -> String {
        let content = normalize_snippet(&document.prompt_content());
        escape_citation_markers(&truncate_words(&content, max_length))
    }

    /// Fit the first `topk` documents into the budget
    pub fn fit<C>(
        &self,
        query: &str,
        documents: &[Document],
        topk: usize,
        counter: &C,
    ) -> Result<FittedPrompt>
    where
        C: TokenCounter + ?Sized,
    {
        if topk == 0 {
            return Err(Error::invalid_input("topk must be at least 1"));
        }
        let count = topk.min(documents.len());
        if count == 0 {
            return Err(Error::invalid_input("no candidate documents to build a prompt from"));
        }
        let budget = self.prompt_budget();
        if budget == 0 {
            return Err(Error::config(
                "context size leaves no room for the prompt after reserved output tokens",
            ));
        }

        let documents = &documents[..count];
        let query = normalize_snippet(query);

        if !self.template.mode().includes_references() {
            return self.fit_without_documents(&query, counter, budget);
        }

        let mut max_length = (self
            .budget
            .context_size
            .saturating_sub(self.budget.fixed_overhead)
            / count)
            .max(1);

        loop {
            let snippets: Vec<String> = documents
                .iter()
                .map(|doc| Self::snippet(doc, max_length))
                .collect();
            let longest = snippets
                .iter()
                .map(|s| s.split_whitespace().count())
                .max()
                .unwrap_or(0);

            let text = self.template.render(&query, &snippets);
            let token_count = counter.count_tokens(&text)?;

            if token_count <= budget {
                tracing::debug!(
                    token_count,
                    budget,
                    max_length,
                    documents = count,
                    "Prompt fits budget"
                );
                return Ok(FittedPrompt {
                    text,
                    token_count,
                    max_length_words: max_length,
                    documents_included: count,
                });
            }

            if max_length <= 1 {
                tracing::warn!(token_count, budget, documents = count, "Prompt budget exhausted");
                return Err(Error::BudgetExhausted {
                    token_count,
                    budget,
                    topk: count,
                });
            }

            let step = ((token_count - budget) / (count * 4)).max(1);
            let mut next = max_length.saturating_sub(step).max(1);
            // No snippet reached the cap: every cap >= longest renders the same prompt
            if longest < max_length {
                next = next.min(longest.saturating_sub(1)).max(1);
            }

            tracing::debug!(
                token_count,
                budget,
                from = max_length,
                to = next,
                "Shrinking snippets"
            );
            max_length = next;
        }
    }

    /// The prompt shows no documents, so there is nothing to shrink
    fn fit_without_documents<C>(
        &self,
        query: &str,
        counter: &C,
        budget: usize,
    ) -> Result<FittedPrompt>
    where
        C: TokenCounter + ?Sized,
    {
        let text = self.template.render(query, &[]);
        let token_count = counter.count_tokens(&text)?;
        if token_count > budget {
            tracing::warn!(token_count, budget, "Prompt budget exhausted without documents");
            return Err(Error::BudgetExhausted {
                token_count,
                budget,
                topk: 0,
            });
        }
        Ok(FittedPrompt {
            text,
            token_count,
            max_length_words: 0,
            documents_included: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::WhitespaceTokenCounter;
    use std::cell::Cell;

    fn doc(id: &str, words: usize) -> Document {
        let body = (0..words)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        Document::new(id, body)
    }

    fn budget(context_size: usize, reserved: usize) -> BudgetConfig {
        BudgetConfig {
            context_size,
            reserved_output_tokens: reserved,
            fixed_overhead: 200,
            topk: 20,
        }
    }

    #[test]
    fn test_snippet_normalization() {
        let document = Document::new("d", "See  [3]\nand\tmore [x] words here").with_title("T");
        assert_eq!(
            PromptBudgetFitter::snippet(&document, 5),
            "Title: T Content: See (3)"
        );
    }

    #[test]
    fn test_fits_without_shrinking() {
        let fitter = PromptBudgetFitter::new(budget(8192, 1500), PromptTemplate::default());
        let documents = vec![doc("a", 10), doc("b", 10)];
        let prompt = fitter
            .fit("what is it", &documents, 5, &WhitespaceTokenCounter)
            .unwrap();

        assert_eq!(prompt.documents_included, 2);
        assert!(prompt.text.contains("[1] w0 w1"));
        assert!(prompt.text.contains("[2] w0 w1"));
        assert!(prompt.text.contains("Query: what is it"));
        assert!(prompt.token_count <= fitter.prompt_budget());
    }

    #[test]
    fn test_shrinks_until_fit() {
        // Instructions alone are roughly 150 words, leaving a few hundred for snippets
        let fitter = PromptBudgetFitter::new(budget(1000, 500), PromptTemplate::default());
        let documents: Vec<Document> = (0..5).map(|i| doc(&i.to_string(), 400)).collect();
        let prompt = fitter
            .fit("query", &documents, 5, &WhitespaceTokenCounter)
            .unwrap();

        assert!(prompt.token_count <= 500);
        assert!(prompt.max_length_words < 400);
        assert_eq!(prompt.documents_included, 5);
    }

    #[test]
    fn test_budget_exhausted() {
        let fitter = PromptBudgetFitter::new(budget(300, 290), PromptTemplate::default());
        let documents = vec![doc("a", 50), doc("b", 50)];
        let result = fitter.fit("query", &documents, 2, &WhitespaceTokenCounter);

        match result {
            Err(Error::BudgetExhausted { budget, topk, .. }) => {
                assert_eq!(budget, 10);
                assert_eq!(topk, 2);
            }
            other => panic!("expected BudgetExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_short_documents_skip_to_longest() {
        // Nothing is truncated at the initial cap, so the loop must jump to the
        // snippet length instead of walking down one word at a time.
        let calls = Cell::new(0usize);
        let counter = |text: &str| {
            calls.set(calls.get() + 1);
            text.split_whitespace().count() + 1_000_000
        };
        let fitter = PromptBudgetFitter::new(budget(128_000, 1000), PromptTemplate::default());
        let result = fitter.fit("q", &[doc("a", 3)], 1, &counter);

        assert!(result.unwrap_err().is_budget_exhausted());
        assert!(calls.get() <= 4, "took {} iterations", calls.get());
    }

    #[test]
    fn test_topk_clamped_and_validated() {
        let fitter = PromptBudgetFitter::new(budget(8192, 1500), PromptTemplate::default());
        let documents = vec![doc("a", 5)];

        let prompt = fitter.fit("q", &documents, 10, &WhitespaceTokenCounter).unwrap();
        assert_eq!(prompt.documents_included, 1);

        assert!(matches!(
            fitter.fit("q", &documents, 0, &WhitespaceTokenCounter),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            fitter.fit("q", &[], 3, &WhitespaceTokenCounter),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_no_cite_mode_omits_references() {
        let template = PromptTemplate::new(PromptMode::RagnarokV4NoCite);
        let text = template.render("q", &["snippet one".to_string()]);
        assert!(!text.contains("snippet one"));
        assert!(!PromptMode::RagnarokV4NoCite.includes_references());
    }

    #[test]
    fn test_no_cite_mode_reports_no_documents() {
        let fitter = PromptBudgetFitter::new(
            budget(8192, 1500),
            PromptTemplate::new(PromptMode::RagnarokV4NoCite),
        );
        let documents = vec![doc("a", 10), doc("b", 10)];
        let prompt = fitter
            .fit("what is it", &documents, 5, &WhitespaceTokenCounter)
            .unwrap();

        assert_eq!(prompt.documents_included, 0);
        assert!(!prompt.text.contains("w0"));
        assert!(prompt.text.contains("Query: what is it"));
    }
}
