//! Core types for the attribution engine

pub mod answer;
pub mod document;
pub mod exec;
pub mod query;
pub mod record;

pub use answer::{write_json, write_jsonl, Answer, CitedSentence};
pub use document::{DocId, Document, Identifier, TopicId};
pub use exec::{read_exec_prompts, write_exec_summaries, ExecRecord, ExecSummary};
pub use query::{read_requests, Candidate, CandidateDoc, Query, Request};
pub use record::{AnswerRecord, RecordCitation, RecordSentence, RunMetadata, PLACEHOLDER_ANSWER};
