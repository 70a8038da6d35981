//! Conversion of 2024-layout run files into the 2025 layout

use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::error::Result;
use crate::types::AnswerRecord;

/// Counts from one conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub converted: usize,
    /// Lines skipped because they were not a JSON record
    pub failed: usize,
}

/// Convert every record of `input`, writing one 2025-layout record per line
///
/// `prompts` maps topic ids to the prompt text recorded for them; a match is
/// copied into `metadata.prompt`.
pub fn convert_run<R, W>(
    input: R,
    mut output: W,
    prompts: &HashMap<String, String>,
) -> Result<ConversionSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = ConversionSummary::default();

    for (idx, bytes) in input.split(b'\n').enumerate() {
        let bytes = bytes?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let record: AnswerRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line = idx + 1, error = %e, "Skipping unparsable record");
                summary.failed += 1;
                continue;
            }
        };

        let prompt = record
            .effective_topic_id()
            .and_then(|id| prompts.get(&id.key()))
            .map(String::as_str);
        serde_json::to_writer(&mut output, &record.to_trec25(prompt))?;
        output.write_all(b"\n")?;
        summary.converted += 1;
    }

    output.flush()?;
    tracing::info!(
        converted = summary.converted,
        failed = summary.failed,
        "Converted run"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_run() {
        let input = concat!(
            r#"{"run_id":"r","topic_id":"2024-001","topic":"t","references":["a"],"response_length":1,"answer":[{"text":"x","citations":[0]}]}"#,
            "\n{broken\n\n",
            r#"{"run_id":"r","topic_id":"2024-002","topic":"u","references":[],"answer":[]}"#,
            "\n"
        );
        let prompts = HashMap::from([("2024-002".to_string(), "prompt two".to_string())]);

        let mut out = Vec::new();
        let summary = convert_run(input.as_bytes(), &mut out, &prompts).unwrap();
        assert_eq!(summary, ConversionSummary { converted: 2, failed: 1 });

        let lines: Vec<AnswerRecord> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| AnswerRecord::from_json_line(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].metadata.as_ref().unwrap().prompt.is_none());
        assert_eq!(
            lines[1].metadata.as_ref().unwrap().prompt,
            Some(serde_json::Value::from("prompt two"))
        );
        assert!(lines.iter().all(|r| r.topic_id.is_none() && r.response_length.is_none()));
    }
}
