//! Execution summaries: the prompt and raw response behind each answer

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, Write};

use super::document::DocId;
use super::query::Query;
use crate::error::Result;

/// What was sent to the generator and what came back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecSummary {
    /// Prompt text as sent
    pub prompt: String,
    /// Raw generator output, markers included
    pub response: String,
    /// Prompt tokens as measured by the backend's counter
    pub input_token_count: usize,
    /// Ids of the documents rendered into the prompt, in prompt order
    #[serde(default)]
    pub candidates: Vec<DocId>,
}

/// One line of an execution summary file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecRecord {
    pub query: Query,
    pub rag_exec_summary: ExecSummary,
}

/// Write execution summaries one JSON object per line
pub fn write_exec_summaries<W: Write>(records: &[ExecRecord], mut writer: W) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Prompts from an execution summary file, keyed by topic id
///
/// Lines that do not parse are skipped with a warning.
pub fn read_exec_prompts<R: BufRead>(reader: R) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<ExecRecord>(&line) {
            Ok(record) => {
                prompts.insert(record.query.qid.key(), record.rag_exec_summary.prompt);
            }
            Err(e) => tracing::warn!(line = idx + 1, error = %e, "Skipping execution summary line"),
        }
    }
    tracing::info!(prompts = prompts.len(), "Loaded prompts");
    Ok(prompts)
}
