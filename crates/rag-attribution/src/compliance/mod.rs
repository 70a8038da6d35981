//! Output contract enforcement
//!
//! Validation runs in two passes. [`ComplianceValidator::scan`] collects
//! every finding without mutating anything; when repair is enabled the
//! repairs attached to warnings are then applied by [`repair::apply_repairs`].
//! Errors never trigger a repair, and a record with any error is rejected.

pub mod batch;
pub mod convert;
pub mod diagnostics;
pub mod finding;
pub mod repair;
mod scan;
pub mod topics;

pub use batch::{BatchSummary, BatchValidator, RecordOutcome};
pub use convert::{convert_run, ConversionSummary};
pub use diagnostics::{DiagnosticEntry, DiagnosticLog};
pub use finding::{Finding, FindingClass, FindingKind, Repair, Severity, ValidationReport};
pub use repair::{apply_repairs, trim_from_end};
pub use topics::TopicSet;

use regex::Regex;

use crate::config::{CitationFormat, ComplianceConfig, RunSchema};
use crate::error::Result;
use crate::types::{Answer, AnswerRecord};

/// Checks answers against the output contract and applies bounded repairs
#[derive(Debug, Clone)]
pub struct ComplianceValidator {
    reference_pattern: Regex,
    response_limit: usize,
    reference_limit: usize,
    repair: bool,
    schema: RunSchema,
    citation_format: CitationFormat,
}

impl ComplianceValidator {
    /// Build a validator, compiling the reference pattern
    pub fn new(config: &ComplianceConfig) -> Result<Self> {
        Ok(Self {
            reference_pattern: Regex::new(&config.reference_pattern)?,
            response_limit: config.response_limit,
            reference_limit: config.reference_limit,
            repair: config.repair,
            schema: config.schema,
            citation_format: config.citation_format,
        })
    }

    pub fn response_limit(&self) -> usize {
        self.response_limit
    }

    pub fn repair_enabled(&self) -> bool {
        self.repair
    }

    pub fn schema(&self) -> RunSchema {
        self.schema
    }

    /// Scan a record and, when enabled, repair it in place
    pub fn validate_record(
        &self,
        record: &mut AnswerRecord,
        expected_topic: Option<&str>,
    ) -> ValidationReport {
        self.validate_as(record, expected_topic, self.schema, self.citation_format)
    }

    fn validate_as(
        &self,
        record: &mut AnswerRecord,
        expected_topic: Option<&str>,
        schema: RunSchema,
        format: CitationFormat,
    ) -> ValidationReport {
        let findings = self.scan_as(record, expected_topic, schema, format);
        let mut report = ValidationReport::from_findings(findings);
        if self.repair {
            let repairs = report.pending_repairs();
            if !repairs.is_empty() {
                report.repaired =
                    apply_repairs(record, &repairs, self.response_limit, expected_topic);
            }
        }
        report
    }

    /// Validate a typed answer against its official topic text
    ///
    /// Typed answers always use the 2024 layout with index citations, whatever
    /// the configured run schema. The returned answer carries any repairs;
    /// `response_length` is always the word count of the surviving sentences.
    pub fn validate(&self, answer: &Answer, topic: &str) -> Result<(Answer, ValidationReport)> {
        let mut record = AnswerRecord::from(answer);
        let report =
            self.validate_as(&mut record, Some(topic), RunSchema::Trec24, CitationFormat::Index);
        let answer = if report.repaired {
            record.to_answer()?
        } else {
            answer.clone()
        };
        Ok((answer, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CitedSentence, DocId, RecordCitation};

    const REF_A: &str = "msmarco_v2.1_doc_04_420132660#5_814560531";
    const REF_B: &str = "msmarco_v2.1_doc_13_1647729865#2_3617397938";

    fn validator() -> ComplianceValidator {
        ComplianceValidator::new(&ComplianceConfig::default()).unwrap()
    }

    fn answer(sentences: Vec<CitedSentence>) -> Answer {
        Answer::new(
            "2024-001",
            "Test topic",
            vec![DocId::from(REF_A), DocId::from(REF_B)],
            sentences,
        )
    }

    fn kinds(report: &ValidationReport) -> Vec<FindingKind> {
        report.findings.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn test_clean_answer() {
        let input = answer(vec![CitedSentence::new("Test answer.", vec![0, 1])]);
        let (output, report) = validator().validate(&input, "Test topic").unwrap();

        assert!(report.is_accepted());
        assert!(report.warnings.is_empty());
        assert!(!report.repaired);
        assert_eq!(output, input);
    }

    #[test]
    fn test_topic_mismatch_is_error() {
        let input = answer(vec![CitedSentence::new("x", vec![0])]);
        let (_, report) = validator().validate(&input, "Other topic").unwrap();
        assert!(!report.is_accepted());
        assert_eq!(kinds(&report), vec![FindingKind::TopicMismatch]);
    }

    #[test]
    fn test_duplicate_citations_repaired() {
        let input = answer(vec![CitedSentence::new("x y", vec![1, 0, 1])]);
        let (output, report) = validator().validate(&input, "Test topic").unwrap();

        assert!(report.is_accepted());
        assert!(report.repaired);
        assert_eq!(output.sentences[0].citations, vec![1, 0]);
    }

    #[test]
    fn test_out_of_range_is_error_and_dropped() {
        let input = answer(vec![CitedSentence::new("x", vec![0, 4])]);
        let (output, report) = validator().validate(&input, "Test topic").unwrap();

        assert!(!report.is_accepted());
        assert_eq!(
            kinds(&report),
            vec![FindingKind::InvalidCitation, FindingKind::OutOfRangeCitation]
        );
        assert_eq!(output.sentences[0].citations, vec![0]);
    }

    #[test]
    fn test_reference_format_and_duplicates() {
        let mut input = answer(vec![CitedSentence::new("x", vec![0])]);
        input.references = vec![DocId::from("doc-1"), DocId::from(REF_A), DocId::from(REF_A)];
        let (_, report) = validator().validate(&input, "Test topic").unwrap();

        assert_eq!(
            kinds(&report),
            vec![FindingKind::ReferenceFormat, FindingKind::DuplicateReference]
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_too_many_references() {
        let config = ComplianceConfig {
            reference_limit: 1,
            ..Default::default()
        };
        let validator = ComplianceValidator::new(&config).unwrap();
        let input = answer(vec![CitedSentence::new("x", vec![0, 1])]);
        let (_, report) = validator.validate(&input, "Test topic").unwrap();
        assert_eq!(kinds(&report), vec![FindingKind::TooManyReferences]);
    }

    #[test]
    fn test_overlong_answer_trimmed() {
        let sentences = (0..90)
            .map(|i| CitedSentence::new("one two three four five", vec![i % 2]))
            .collect();
        let input = answer(sentences);
        assert_eq!(input.response_length, 450);

        let (output, report) = validator().validate(&input, "Test topic").unwrap();
        assert!(report.is_accepted());
        assert!(report.repaired);
        assert_eq!(output.sentences.len(), 80);
        assert_eq!(output.response_length, 400);
        assert_eq!(
            kinds(&report),
            vec![
                FindingKind::ReportedLengthOverLimit,
                FindingKind::ResponseTooLong
            ]
        );
    }

    #[test]
    fn test_repair_disabled() {
        let config = ComplianceConfig {
            repair: false,
            ..Default::default()
        };
        let validator = ComplianceValidator::new(&config).unwrap();
        let input = answer(vec![CitedSentence::new("x", vec![0, 0])]);
        let (output, report) = validator.validate(&input, "Test topic").unwrap();

        assert!(!report.repaired);
        assert_eq!(output.sentences[0].citations, vec![0, 0]);
        assert_eq!(kinds(&report), vec![FindingKind::DuplicateCitation]);
    }

    #[test]
    fn test_missing_fields_reported() {
        let mut record = AnswerRecord::from_json_line(r#"{"topic_id":"2024-001"}"#).unwrap();
        let report = validator().validate_record(&mut record, Some("Test topic"));
        assert_eq!(report.errors.len(), 3);
        assert!(report
            .errors
            .iter()
            .any(|e| e == "Entry is missing \"references\" field."));
    }

    #[test]
    fn test_length_mismatch_fixed() {
        let mut record = AnswerRecord::from(&answer(vec![CitedSentence::new("a b c", vec![0])]));
        record.response_length = Some(10);
        let report = validator().validate_record(&mut record, Some("Test topic"));

        assert_eq!(kinds(&report), vec![FindingKind::LengthMismatch]);
        assert!(report.repaired);
        assert_eq!(record.response_length, Some(3));
    }

    fn trec25_validator(citation_format: CitationFormat) -> ComplianceValidator {
        let config = ComplianceConfig {
            schema: RunSchema::Trec25,
            citation_format,
            ..Default::default()
        };
        ComplianceValidator::new(&config).unwrap()
    }

    #[test]
    fn test_trec25_clean_record() {
        let line = format!(
            r#"{{"metadata":{{"team_id":"t","run_id":"r","type":"manual","narrative_id":"2024-001","narrative":"Test topic","prompt":"p"}},"references":["{}"],"answer":[{{"text":"x y","citations":[0]}}]}}"#,
            REF_A
        );
        let mut record = AnswerRecord::from_json_line(&line).unwrap();
        let report = trec25_validator(CitationFormat::Index)
            .validate_record(&mut record, Some("Test topic"));

        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert!(record.response_length.is_none());
    }

    #[test]
    fn test_trec25_metadata_checks() {
        let mut record = AnswerRecord::from_json_line(
            r#"{"metadata":{"run_id":"r","type":"semi"},"references":[],"answer":[]}"#,
        )
        .unwrap();
        let report = trec25_validator(CitationFormat::Index).validate_record(&mut record, None);

        assert_eq!(
            report.errors,
            vec![
                "metadata missing keys: team_id, narrative_id",
                "invalid metadata.type: semi"
            ]
        );
        assert_eq!(
            kinds(&report),
            vec![
                FindingKind::MissingField,
                FindingKind::InvalidRunType,
                FindingKind::MissingNarrative,
                FindingKind::MissingOptionalField
            ]
        );
    }

    #[test]
    fn test_trec25_requires_metadata_object() {
        let mut record =
            AnswerRecord::from_json_line(r#"{"references":[],"answer":[]}"#).unwrap();
        let report = trec25_validator(CitationFormat::Index).validate_record(&mut record, None);
        assert_eq!(kinds(&report), vec![FindingKind::MissingMetadata]);
    }

    #[test]
    fn test_trec25_missing_narrative_is_filled() {
        let mut record = AnswerRecord::from_json_line(
            r#"{"metadata":{"team_id":"t","run_id":"r","narrative_id":1,"prompt":"p"},"references":[],"answer":[]}"#,
        )
        .unwrap();
        let report = trec25_validator(CitationFormat::Index)
            .validate_record(&mut record, Some("Official"));

        assert!(report.is_accepted());
        assert!(report.repaired);
        let metadata = record.metadata.unwrap();
        assert_eq!(metadata.narrative.as_deref(), Some("Official"));
    }

    #[test]
    fn test_segment_id_citations() {
        let line = format!(
            r#"{{"metadata":{{"team_id":"t","run_id":"r","type":"automatic","narrative_id":1,"narrative":"n","prompt":"p"}},"references":["{a}"],"answer":[{{"text":"x","citations":["{a}","{b}"]}},{{"text":"y","citations":[0]}}]}}"#,
            a = REF_A,
            b = REF_B
        );
        let mut record = AnswerRecord::from_json_line(&line).unwrap();
        let report = trec25_validator(CitationFormat::SegmentId)
            .validate_record(&mut record, Some("n"));

        assert_eq!(
            report.errors,
            vec![
                format!("answer[0].citation not found in references: {}", REF_B),
                "answer[1].citations must be strings (segment IDs)".to_string()
            ]
        );
        let sentences = record.answer.unwrap();
        assert_eq!(sentences[0].citations, Some(vec![RecordCitation::from(REF_A)]));
    }

    #[test]
    fn test_index_format_rejects_segment_ids() {
        let mut record = AnswerRecord::from(&answer(vec![CitedSentence::new("x", vec![0])]));
        record.answer = Some(vec![crate::types::RecordSentence {
            text: Some("x".to_string()),
            citations: Some(vec![RecordCitation::from(REF_A)]),
        }]);
        let report = validator().validate_record(&mut record, Some("Test topic"));
        assert_eq!(
            report.errors,
            vec!["answer[0].citations must be ints (indexes into references)"]
        );
    }
}
