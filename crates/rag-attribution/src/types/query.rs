//! Generation requests: a topic plus its ranked candidates

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::document::{DocId, Document, TopicId};
use crate::error::{Error, Result};

/// The question being answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Topic text
    pub text: String,
    /// Topic id
    pub qid: TopicId,
}

/// Candidate passage as produced by retrieval and reranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Document id
    pub docid: DocId,
    /// Retrieval or rerank score
    #[serde(default)]
    pub score: f32,
    /// Passage payload
    pub doc: CandidateDoc,
}

/// Passage payload; retrieval backends disagree on the body field name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDoc {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(alias = "text", alias = "segment", alias = "contents", alias = "passage")]
    pub body: String,
}

impl From<&Candidate> for Document {
    fn from(candidate: &Candidate) -> Self {
        Document {
            id: candidate.docid.clone(),
            title: candidate.doc.title.clone(),
            body: candidate.doc.body.clone(),
        }
    }
}

/// A generation request: one topic and its ranked candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub query: Query,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl Request {
    /// Create a request from documents already in rank order
    pub fn new(query: Query, documents: &[Document]) -> Self {
        let candidates = documents
            .iter()
            .map(|doc| Candidate {
                docid: doc.id.clone(),
                score: 0.0,
                doc: CandidateDoc {
                    title: doc.title.clone(),
                    body: doc.body.clone(),
                },
            })
            .collect();
        Self { query, candidates }
    }

    /// The first `topk` candidates as documents
    pub fn documents(&self, topk: usize) -> Vec<Document> {
        self.candidates.iter().take(topk).map(Document::from).collect()
    }

    /// Ids of the first `topk` candidates; index `i` is citation `i`
    pub fn references(&self, topk: usize) -> Vec<DocId> {
        self.candidates
            .iter()
            .take(topk)
            .map(|c| c.docid.clone())
            .collect()
    }
}

/// Read requests from a `.json` array or `.jsonl` file
pub fn read_requests(path: impl AsRef<Path>) -> Result<Vec<Request>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match extension.as_str() {
        "jsonl" => {
            let reader = BufReader::new(File::open(path)?);
            let mut requests = Vec::new();
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                requests.push(serde_json::from_str(&line)?);
            }
            Ok(requests)
        }
        "json" => {
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_json::from_reader(reader)?)
        }
        other => Err(Error::invalid_input(format!(
            "Expected json or jsonl file format, got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_candidate_body_aliases() {
        let json = r#"{
            "query": {"text": "what is rust", "qid": 7},
            "candidates": [
                {"docid": "a", "score": 1.5, "doc": {"segment": "seg body", "title": "T"}},
                {"docid": "b", "doc": {"contents": "contents body"}}
            ]
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        let docs = request.documents(5);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].body, "seg body");
        assert_eq!(docs[0].title.as_deref(), Some("T"));
        assert_eq!(docs[1].body, "contents body");
        assert_eq!(request.references(1), vec![DocId::from("a")]);
    }

    #[test]
    fn test_read_requests_jsonl() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(
            file,
            r#"{{"query": {{"text": "q1", "qid": "1"}}, "candidates": []}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"query": {{"text": "q2", "qid": "2"}}, "candidates": []}}"#
        )
        .unwrap();

        let requests = read_requests(file.path()).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].query.text, "q2");
    }

    #[test]
    fn test_read_requests_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(matches!(
            read_requests(file.path()),
            Err(Error::InvalidInput(_))
        ));
    }
}
