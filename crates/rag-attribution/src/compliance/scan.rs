//! Read-only pass collecting every finding for one record

use std::collections::HashSet;

use super::finding::{Finding, FindingKind, Repair};
use super::ComplianceValidator;
use crate::config::{CitationFormat, RunSchema};
use crate::types::{AnswerRecord, DocId, RecordCitation, RecordSentence};

const RUN_TYPES: [&str; 2] = ["manual", "automatic"];

impl ComplianceValidator {
    /// Collect findings without touching the record
    ///
    /// `expected_topic` is the official text for the record's topic id, when
    /// the caller has a topic list.
    pub fn scan(&self, record: &AnswerRecord, expected_topic: Option<&str>) -> Vec<Finding> {
        self.scan_as(record, expected_topic, self.schema, self.citation_format)
    }

    pub(super) fn scan_as(
        &self,
        record: &AnswerRecord,
        expected_topic: Option<&str>,
        schema: RunSchema,
        format: CitationFormat,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();

        let required: Vec<(&str, bool)> = match schema {
            RunSchema::Trec24 => vec![
                ("topic_id", record.topic_id.is_some()),
                ("topic", record.topic.is_some()),
                ("references", record.references.is_some()),
                ("answer", record.answer.is_some()),
            ],
            RunSchema::Trec25 => vec![
                ("references", record.references.is_some()),
                ("answer", record.answer.is_some()),
            ],
        };
        for (field, present) in required {
            if !present {
                findings.push(Finding::error(
                    FindingKind::MissingField,
                    format!("Entry is missing \"{}\" field.", field),
                ));
            }
        }

        match schema {
            RunSchema::Trec24 => {
                if let (Some(topic), Some(expected)) = (record.topic.as_deref(), expected_topic) {
                    if topic != expected {
                        findings.push(Finding::error(
                            FindingKind::TopicMismatch,
                            "Topic text does not match official topic for this topic ID",
                        ));
                    }
                }
            }
            RunSchema::Trec25 => scan_metadata(record, expected_topic, &mut findings),
        }

        if let Some(references) = &record.references {
            self.scan_references(references, &mut findings);
        }
        if let Some(sentences) = &record.answer {
            self.scan_sentences(sentences, record.references.as_deref(), format, &mut findings);
            if schema == RunSchema::Trec24 {
                self.scan_reported_length(record, &mut findings);
            }
            self.scan_length(record, &mut findings);
        }

        findings
    }

    fn scan_references(&self, references: &[DocId], findings: &mut Vec<Finding>) {
        let mut seen = HashSet::new();
        for (idx, reference) in references.iter().enumerate() {
            let key = reference.key();
            if !self.reference_pattern.is_match(&key) {
                findings.push(Finding::warning(
                    FindingKind::ReferenceFormat,
                    format!("reference[{}] does not match the expected format: {}", idx, key),
                ));
            }
            if !seen.insert(key.clone()) {
                findings.push(Finding::error(
                    FindingKind::DuplicateReference,
                    format!("Duplicate document {} in references", key),
                ));
            }
        }

        if references.len() > self.reference_limit {
            findings.push(Finding::error(
                FindingKind::TooManyReferences,
                format!(
                    "Too many references ({}, max {})",
                    references.len(),
                    self.reference_limit
                ),
            ));
        }
    }

    fn scan_sentences(
        &self,
        sentences: &[RecordSentence],
        references: Option<&[DocId]>,
        format: CitationFormat,
        findings: &mut Vec<Finding>,
    ) {
        for (idx, sentence) in sentences.iter().enumerate() {
            if sentence.text.is_none() {
                findings.push(Finding::error(
                    FindingKind::MissingField,
                    format!("answer[{}].text missing", idx),
                ));
            }
            let Some(citations) = &sentence.citations else {
                findings.push(Finding::error(
                    FindingKind::MissingField,
                    format!("answer[{}].citations missing", idx),
                ));
                continue;
            };

            let wrong_type = citations.iter().any(|c| {
                !matches!(
                    (format, c),
                    (CitationFormat::Index, RecordCitation::Index(_))
                        | (CitationFormat::SegmentId, RecordCitation::Segment(_))
                )
            });
            if wrong_type {
                let expected = match format {
                    CitationFormat::Index => "ints (indexes into references)",
                    CitationFormat::SegmentId => "strings (segment IDs)",
                };
                findings.push(Finding::error(
                    FindingKind::CitationFormat,
                    format!("answer[{}].citations must be {}", idx, expected),
                ));
            } else if let Some(references) = references {
                // Without a reference list every citation is unresolvable; that is
                // already reported as a missing field.
                let invalid: Vec<&RecordCitation> = citations
                    .iter()
                    .filter(|c| c.resolve(references).is_none())
                    .collect();
                for citation in &invalid {
                    let message = match citation {
                        RecordCitation::Index(_) => {
                            format!("Response sentence {} has invalid citation {}", idx, citation)
                        }
                        RecordCitation::Segment(_) => {
                            format!("answer[{}].citation not found in references: {}", idx, citation)
                        }
                    };
                    findings.push(Finding::error(FindingKind::InvalidCitation, message));
                }
                if !invalid.is_empty() {
                    findings.push(
                        Finding::warning(
                            FindingKind::OutOfRangeCitation,
                            format!("Response sentence {} has a citation that is out of bounds", idx),
                        )
                        .with_repair(Repair::DropOutOfRange { sentence: idx }),
                    );
                }
            }

            let mut seen = HashSet::new();
            if !citations.iter().all(|c| seen.insert(c)) {
                findings.push(
                    Finding::warning(
                        FindingKind::DuplicateCitation,
                        format!("Response sentence {} has duplicate citations", idx),
                    )
                    .with_repair(Repair::DedupeCitations { sentence: idx }),
                );
            }
        }
    }

    fn scan_reported_length(&self, record: &AnswerRecord, findings: &mut Vec<Finding>) {
        let length = record.computed_length();
        match record.response_length {
            None => findings.push(
                Finding::warning(
                    FindingKind::MissingResponseLength,
                    format!("Entry is missing \"response_length\" field, using {}", length),
                )
                .with_repair(Repair::SetResponseLength),
            ),
            Some(reported) if reported > self.response_limit as i64 => {
                findings.push(Finding::warning(
                    FindingKind::ReportedLengthOverLimit,
                    "Reported response_length is too long",
                ));
            }
            Some(_) => {}
        }

        // An overlong answer is trimmed instead, which rewrites the length
        if length > self.response_limit {
            return;
        }
        if let Some(reported) = record.response_length {
            if reported != length as i64 {
                findings.push(
                    Finding::warning(
                        FindingKind::LengthMismatch,
                        format!(
                            "Reported RAG answer ({}) is not equal to actual response length ({}), maybe you did not NFKC normalize the text or strip characters?",
                            reported, length
                        ),
                    )
                    .with_repair(Repair::SetResponseLength),
                );
            }
        }
    }

    fn scan_length(&self, record: &AnswerRecord, findings: &mut Vec<Finding>) {
        let length = record.computed_length();
        if length > self.response_limit {
            findings.push(
                Finding::warning(
                    FindingKind::ResponseTooLong,
                    format!("RAG answer is too long ({} words)", length),
                )
                .with_repair(Repair::TrimFromEnd),
            );
        }
    }
}

fn scan_metadata(record: &AnswerRecord, expected_topic: Option<&str>, findings: &mut Vec<Finding>) {
    let Some(metadata) = &record.metadata else {
        findings.push(Finding::error(
            FindingKind::MissingMetadata,
            "metadata must be an object",
        ));
        return;
    };

    let missing: Vec<&str> = [
        ("team_id", metadata.team_id.is_some()),
        ("run_id", metadata.run_id.is_some()),
        ("narrative_id", metadata.narrative_id.is_some()),
    ]
    .into_iter()
    .filter(|(_, present)| !present)
    .map(|(key, _)| key)
    .collect();
    if !missing.is_empty() {
        findings.push(Finding::error(
            FindingKind::MissingField,
            format!("metadata missing keys: {}", missing.join(", ")),
        ));
    }

    match metadata.run_type.as_deref() {
        Some(run_type) if !RUN_TYPES.contains(&run_type) => findings.push(Finding::error(
            FindingKind::InvalidRunType,
            format!("invalid metadata.type: {}", run_type),
        )),
        Some(_) => {}
        None => findings.push(Finding::warning(
            FindingKind::MissingOptionalField,
            "optional field 'type' is missing from metadata",
        )),
    }

    if metadata.narrative.is_none() {
        let finding = Finding::warning(
            FindingKind::MissingNarrative,
            "optional field 'narrative' is missing from metadata",
        );
        findings.push(match expected_topic {
            Some(_) => finding.with_repair(Repair::FillNarrative),
            None => finding,
        });
    }

    if metadata.prompt.is_none() {
        findings.push(Finding::warning(
            FindingKind::MissingOptionalField,
            "optional field 'prompt' is missing from metadata",
        ));
    }
}
