//! Run file validation
//!
//! A run file holds one JSON answer record per line. Every record is scanned
//! and repaired on its own; problems in one record never stop the batch.
//! Only records without errors are written to the fixed output.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::diagnostics::DiagnosticLog;
use super::finding::{Finding, FindingKind, ValidationReport};
use super::topics::TopicSet;
use super::ComplianceValidator;
use crate::config::ComplianceConfig;
use crate::error::Result;
use crate::types::{AnswerRecord, TopicId};

/// Run file name that stands for standard input
pub const STDIN: &str = "-";

/// Result for one line of the run file
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// 1-based line number
    pub line: usize,
    pub topic_id: Option<TopicId>,
    pub report: ValidationReport,
    /// Parsed and possibly repaired record; `None` when the line was not JSON
    pub record: Option<AnswerRecord>,
}

impl RecordOutcome {
    pub fn is_accepted(&self) -> bool {
        self.record.is_some() && self.report.is_accepted()
    }
}

/// Aggregate result of a run file
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<RecordOutcome>,
    /// Findings about the run as a whole, such as topics without an answer
    pub batch_findings: Vec<Finding>,
    pub log: DiagnosticLog,
}

impl BatchSummary {
    pub fn error_count(&self) -> usize {
        self.log.error_count()
    }

    pub fn warning_count(&self) -> usize {
        self.log.warning_count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn accepted(&self) -> impl Iterator<Item = &AnswerRecord> {
        self.outcomes
            .iter()
            .filter(|o| o.is_accepted())
            .filter_map(|o| o.record.as_ref())
    }

    /// Record a line that could not be parsed at all
    fn reject(&mut self, line: usize, message: String) {
        let finding = Finding::error(FindingKind::MalformedJson, message);
        self.log.record(line, std::slice::from_ref(&finding));
        self.outcomes.push(RecordOutcome {
            line,
            topic_id: None,
            report: ValidationReport::from_findings(vec![finding]),
            record: None,
        });
    }

    /// Write accepted records, one JSON object per line
    pub fn write_fixed<W: Write>(&self, mut writer: W) -> Result<()> {
        for record in self.accepted() {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Validates whole run files against a topic list
#[derive(Debug, Clone)]
pub struct BatchValidator {
    validator: ComplianceValidator,
    require_run_id_consistency: bool,
}

impl BatchValidator {
    pub fn new(config: &ComplianceConfig) -> Result<Self> {
        Ok(Self {
            validator: ComplianceValidator::new(config)?,
            require_run_id_consistency: config.require_run_id_consistency,
        })
    }

    pub fn validator(&self) -> &ComplianceValidator {
        &self.validator
    }

    /// Validate every line of `input`
    ///
    /// Lines are read as raw bytes, so one line that is not UTF-8 is reported
    /// like any other malformed line.
    pub fn run<R: BufRead>(&self, input: R, topics: &TopicSet) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        let mut run_tag: Option<String> = None;
        let mut first_answer: HashMap<String, usize> = HashMap::new();
        let mut last_line = 0;

        for (idx, bytes) in input.split(b'\n').enumerate() {
            let line_no = idx + 1;
            let bytes = bytes?;
            last_line = line_no;

            let line = match String::from_utf8(bytes) {
                Ok(line) => line,
                Err(e) => {
                    summary.reject(
                        line_no,
                        format!(
                            "Error parsing JSON line: invalid UTF-8 at byte {}",
                            e.utf8_error().valid_up_to()
                        ),
                    );
                    continue;
                }
            };
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let mut record = match AnswerRecord::from_json_line(line) {
                Ok(record) => record,
                Err(e) => {
                    summary.reject(
                        line_no,
                        format!("Error parsing JSON line at column {}", e.column()),
                    );
                    continue;
                }
            };

            let mut pre = Vec::new();
            if self.require_run_id_consistency {
                if let Some(run_id) = record.effective_run_id() {
                    match &run_tag {
                        None => run_tag = Some(run_id.to_string()),
                        Some(tag) if tag != run_id => pre.push(Finding::error(
                            FindingKind::RunIdMismatch,
                            format!("Run tag inconsistent (\"{}\" instead of \"{}\")", run_id, tag),
                        )),
                        Some(_) => {}
                    }
                }
            }

            let topic_id = record.effective_topic_id().cloned();
            let expected = match &topic_id {
                Some(id) => match topics.get(id) {
                    Some(text) => Some(text),
                    None => {
                        let message = if record.topic_id.is_some() {
                            format!("Unknown topic ({})", id)
                        } else {
                            format!("metadata.narrative_id '{}' not found in topic file", id)
                        };
                        pre.push(Finding::error(FindingKind::UnknownTopic, message));
                        summary.log.record(line_no, &pre);
                        summary.outcomes.push(RecordOutcome {
                            line: line_no,
                            topic_id: topic_id.clone(),
                            report: ValidationReport::from_findings(pre),
                            record: Some(record),
                        });
                        continue;
                    }
                },
                None => None,
            };

            if let Some(id) = &topic_id {
                if let Some(&first) = first_answer.get(&id.key()) {
                    pre.push(Finding::error(
                        FindingKind::DuplicateAnswer,
                        format!("Duplicate response for topic {} (first at line {})", id, first),
                    ));
                } else {
                    first_answer.insert(id.key(), line_no);
                }
            }

            let scanned = self.validator.validate_record(&mut record, expected);
            let mut report = ValidationReport::from_findings(pre);
            for finding in scanned.findings {
                report.push(finding);
            }
            report.repaired = scanned.repaired;

            summary.log.record(line_no, &report.findings);
            summary.outcomes.push(RecordOutcome {
                line: line_no,
                topic_id,
                report,
                record: Some(record),
            });
        }

        for (id, _) in topics.iter() {
            if !first_answer.contains_key(&id.key()) {
                summary.batch_findings.push(Finding::error(
                    FindingKind::MissingAnswer,
                    format!("No response returned for topic {}", id),
                ));
            }
        }
        summary.log.record(last_line, &summary.batch_findings);

        tracing::info!(
            records = summary.outcomes.len(),
            accepted = summary.accepted().count(),
            errors = summary.error_count(),
            warnings = summary.warning_count(),
            "Validated run"
        );
        Ok(summary)
    }

    /// Validate `runfile`, writing `<runfile>.fixed` (or `output`) and `<runfile>.errlog`
    ///
    /// A `runfile` of `-` reads standard input and writes `stdin.fixed` and
    /// `stdin.errlog` in the working directory.
    pub fn run_files(
        &self,
        runfile: impl AsRef<Path>,
        topics: &TopicSet,
        output: Option<&Path>,
    ) -> Result<BatchSummary> {
        let runfile = runfile.as_ref();
        let (summary, base) = if runfile == Path::new(STDIN) {
            let summary = self.run(std::io::stdin().lock(), topics)?;
            (summary, PathBuf::from("stdin"))
        } else {
            let input = BufReader::new(std::fs::File::open(runfile)?);
            (self.run(input, topics)?, runfile.to_path_buf())
        };

        let fixed_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| sibling(&base, "fixed"));
        let errlog_path = sibling(&base, "errlog");

        let fixed = std::fs::File::create(&fixed_path)?;
        summary.write_fixed(std::io::BufWriter::new(fixed))?;
        summary.log.write_file(&errlog_path)?;

        tracing::info!(
            fixed = %fixed_path.display(),
            errlog = %errlog_path.display(),
            "Wrote validation output"
        );
        Ok(summary)
    }
}

/// `run.jsonl` -> `run.jsonl.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
