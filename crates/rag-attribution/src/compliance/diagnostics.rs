//! Line-addressed diagnostics stream written next to a run file

use std::fmt;
use std::io::Write;
use std::path::Path;

use super::finding::{Finding, Severity};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Line {}: {}", self.severity, self.line, self.message)
    }
}

/// Collected `ERROR Line n: ..` / `WARNING Line n: ..` entries
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Vec<DiagnosticEntry>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(line, "{}", message);
        self.error_count += 1;
        self.entries.push(DiagnosticEntry {
            line,
            severity: Severity::Error,
            message,
        });
    }

    pub fn warn(&mut self, line: usize, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(line, "{}", message);
        self.warning_count += 1;
        self.entries.push(DiagnosticEntry {
            line,
            severity: Severity::Warning,
            message,
        });
    }

    /// Record every finding against `line`
    pub fn record(&mut self, line: usize, findings: &[Finding]) {
        for finding in findings {
            match finding.severity {
                Severity::Error => self.error(line, finding.message.clone()),
                Severity::Warning => self.warn(line, finding.message.clone()),
            }
        }
    }

    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Write all entries, ending with `No errors` when there were none
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{}", entry)?;
        }
        if self.error_count == 0 {
            writeln!(writer, "No errors")?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write_to(std::io::BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::finding::FindingKind;

    #[test]
    fn test_render() {
        let mut log = DiagnosticLog::new();
        log.warn(1, "Reported response_length is too long");
        log.record(
            3,
            &[Finding::error(FindingKind::UnknownTopic, "Unknown topic (2024-999)")],
        );

        assert_eq!(log.error_count(), 1);
        assert_eq!(
            log.render(),
            "WARNING Line 1: Reported response_length is too long\nERROR Line 3: Unknown topic (2024-999)\n"
        );
    }

    #[test]
    fn test_clean_log() {
        let mut log = DiagnosticLog::new();
        log.warn(2, "only a warning");
        assert_eq!(log.render(), "WARNING Line 2: only a warning\nNo errors\n");
    }
}
