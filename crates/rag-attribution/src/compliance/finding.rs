//! Validation findings and the repairs they call for

use serde::Serialize;
use std::fmt;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// Broad class of a finding; errors are contract violations, warnings are drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingClass {
    ContractViolation,
    RepairableDrift,
}

/// What a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MalformedJson,
    MissingField,
    MissingMetadata,
    InvalidRunType,
    CitationFormat,
    RunIdMismatch,
    UnknownTopic,
    TopicMismatch,
    DuplicateReference,
    TooManyReferences,
    InvalidCitation,
    DuplicateAnswer,
    MissingAnswer,
    ReferenceFormat,
    DuplicateCitation,
    OutOfRangeCitation,
    MissingResponseLength,
    ReportedLengthOverLimit,
    ResponseTooLong,
    LengthMismatch,
    MissingOptionalField,
    MissingNarrative,
}

/// A bounded, deterministic correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "repair", rename_all = "snake_case")]
pub enum Repair {
    /// Remove repeated citations in one sentence, keeping first occurrences
    DedupeCitations { sentence: usize },
    /// Remove citations outside the reference list from one sentence
    DropOutOfRange { sentence: usize },
    /// Pop trailing sentences until the answer fits the response limit
    TrimFromEnd,
    /// Overwrite `response_length` with the computed word count
    SetResponseLength,
    /// Copy the official topic text into `metadata.narrative`
    FillNarrative,
}

/// One problem found while scanning a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<Repair>,
}

impl Finding {
    pub fn error(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
            repair: None,
        }
    }

    pub fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            repair: None,
        }
    }

    /// Attach a repair; only warnings are ever repaired
    pub fn with_repair(mut self, repair: Repair) -> Self {
        self.repair = Some(repair);
        self
    }

    pub fn class(&self) -> FindingClass {
        match self.severity {
            Severity::Error => FindingClass::ContractViolation,
            Severity::Warning => FindingClass::RepairableDrift,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Outcome of validating one answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Whether any repair changed the answer
    pub repaired: bool,
    /// Structured form of `errors` and `warnings`, in scan order
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    /// Build a report from scan findings
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let mut report = Self::default();
        for finding in findings {
            report.push(finding);
        }
        report
    }

    pub fn push(&mut self, finding: Finding) {
        match finding.severity {
            Severity::Error => self.errors.push(finding.message.clone()),
            Severity::Warning => self.warnings.push(finding.message.clone()),
        }
        self.findings.push(finding);
    }

    /// No contract violations; repaired warnings do not block acceptance
    pub fn is_accepted(&self) -> bool {
        self.errors.is_empty()
    }

    /// Repairs requested by warnings, in scan order without repeats
    pub fn pending_repairs(&self) -> Vec<Repair> {
        let mut repairs: Vec<Repair> = Vec::new();
        for finding in self.findings.iter().filter(|f| !f.is_error()) {
            if let Some(repair) = finding.repair {
                if !repairs.contains(&repair) {
                    repairs.push(repair);
                }
            }
        }
        repairs
    }
}
