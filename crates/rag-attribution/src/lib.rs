//! rag-attribution: citation attribution and output-contract compliance for RAG answers
//!
//! The engine sits between retrieval and submission. It fits ranked passages
//! into a generator's context window, maps generated sentences back to the
//! passages they cite, compacts the reference list and enforces the answer
//! format expected by downstream scorers.
//!
//! ```no_run
//! use rag_attribution::{AttributionPipeline, EngineConfig};
//! use rag_attribution::generation::{CitationMode, GeneratorOutput};
//! use rag_attribution::text::{UnicodeSentenceSplitter, WhitespaceTokenCounter};
//! # fn main() -> rag_attribution::Result<()> {
//! # let request: rag_attribution::types::Request = unimplemented!();
//! let pipeline = AttributionPipeline::new(EngineConfig::default())?;
//! let prompt = pipeline.prepare(&request, &WhitespaceTokenCounter)?;
//! // ... send prompt.text to a model ...
//! let output = GeneratorOutput::text("Rust is memory safe [1].");
//! let attributed = pipeline.attribute(
//!     &request,
//!     &prompt,
//!     &output,
//!     CitationMode::Marker,
//!     &UnicodeSentenceSplitter,
//! )?;
//! println!("{}", serde_json::to_string(&attributed.answer)?);
//! # Ok(())
//! # }
//! ```

pub mod compliance;
pub mod config;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod reindex;
pub mod text;
pub mod types;

pub use compliance::{BatchValidator, ComplianceValidator, TopicSet, ValidationReport};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use generation::{CitationStrategy, FittedPrompt, Generator, GeneratorOutput, PromptBudgetFitter};
pub use pipeline::{Attributed, AttributionPipeline};
pub use reindex::ReferenceReindexer;
pub use types::{Answer, AnswerRecord, CitedSentence, DocId, Document, TopicId};
