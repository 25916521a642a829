//! JSONL batch runner.
//!
//! Input lines are `{"id", "question", "format_hint"}` objects. Output has
//! one line per input record, in input order. A record that fails becomes
//! `{"id", "final_answer": <error>}` and the rest of the batch carries on.

use crate::orchestrator::HybridAgent;
use crate::state::AgentOutput;
use futures::stream::{self, StreamExt};
use hybrid_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub format_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchResult {
    Answered(AgentOutput),
    Failed {
        id: Option<String>,
        final_answer: String,
    },
}

impl BatchResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, BatchResult::Failed { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Records processed
    pub total: usize,

    /// Records that produced a failure line
    pub failed: usize,

    /// Why reading the input stopped early, if it did
    pub read_error: Option<String>,
}

/// Parse records from a JSONL file.
///
/// Blank lines are skipped. Reading stops at the first line that cannot be
/// read or parsed; the records before it are returned with that error.
pub fn read_records(path: &Path) -> (Vec<BatchRecord>, Option<AppError>) {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            return (
                Vec::new(),
                Some(AppError::Config(format!(
                    "Failed to open batch input {:?}: {}",
                    path, e
                ))),
            )
        }
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_number = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => return (records, Some(AppError::Io(e))),
        };

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<BatchRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                return (
                    records,
                    Some(AppError::Serialization(format!(
                        "Invalid JSON on line {}: {}",
                        line_number, e
                    ))),
                )
            }
        }
    }

    (records, None)
}

/// Write results as JSONL, creating the parent directory if needed.
pub fn write_results(path: &Path, results: &[BatchResult]) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    for result in results {
        serde_json::to_writer(&mut writer, result)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(())
}

async fn process_record(agent: &HybridAgent, record: BatchRecord) -> BatchResult {
    let Some(question) = record.question.as_deref() else {
        return BatchResult::Failed {
            id: record.id,
            final_answer: "Record has no question".to_string(),
        };
    };

    let id = record.id.as_deref().unwrap_or_default();
    let format_hint = record.format_hint.as_deref().unwrap_or_default();

    let outcome = agent.invoke(id, question, format_hint).await;
    match outcome {
        Ok(output) => BatchResult::Answered(output),
        Err(e) => {
            tracing::error!("Record {:?} failed: {}", record.id, e);
            BatchResult::Failed {
                id: record.id,
                final_answer: e.to_string(),
            }
        }
    }
}

/// Answer every record in `input` and write the results to `output`.
///
/// The output file is written even when the input could only be partly
/// read (or not at all). `Err` means the output could not be written.
pub async fn run_batch(
    agent: &HybridAgent,
    input: &Path,
    output: &Path,
    concurrency: usize,
) -> AppResult<BatchSummary> {
    let (records, read_error) = read_records(input);
    if let Some(e) = &read_error {
        tracing::error!("Stopped reading {:?}: {}", input, e);
    }

    tracing::info!("Processing {} records from {:?}", records.len(), input);

    let results: Vec<BatchResult> = stream::iter(records)
        .map(|record| process_record(agent, record))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    write_results(output, &results)?;

    let failed = results.iter().filter(|r| r.is_failed()).count();
    tracing::info!(
        "Wrote {} results to {:?} ({} failed)",
        results.len(),
        output,
        failed
    );

    Ok(BatchSummary {
        total: results.len(),
        failed,
        read_error: read_error.map(|e| e.to_string()),
    })
}

/// Write a failure line carrying `reason` for every record in `input`.
///
/// Used when no agent could be built: the output file still lists each
/// record, so callers can tell which questions went unanswered.
pub fn fail_batch(input: &Path, output: &Path, reason: &str) -> AppResult<BatchSummary> {
    let (records, read_error) = read_records(input);
    if let Some(e) = &read_error {
        tracing::error!("Stopped reading {:?}: {}", input, e);
    }

    let results: Vec<BatchResult> = records
        .into_iter()
        .map(|record| BatchResult::Failed {
            id: record.id,
            final_answer: reason.to_string(),
        })
        .collect();

    write_results(output, &results)?;
    tracing::warn!("Wrote {} failed results to {:?}", results.len(), output);

    Ok(BatchSummary {
        total: results.len(),
        failed: results.len(),
        read_error: read_error.map(|e| e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_records_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.jsonl");
        fs::write(
            &path,
            "{\"id\": \"a\", \"question\": \"q1\", \"format_hint\": \"int\"}\n\n{\"id\": \"b\", \"question\": \"q2\"}\n",
        )
        .unwrap();

        let (records, error) = read_records(&path);

        assert!(error.is_none());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].format_hint.as_deref(), Some("int"));
        assert!(records[1].format_hint.is_none());
    }

    #[test]
    fn test_read_records_stops_at_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.jsonl");
        fs::write(
            &path,
            "{\"id\": \"a\", \"question\": \"q1\"}\nnot json\n{\"id\": \"c\", \"question\": \"q3\"}\n",
        )
        .unwrap();

        let (records, error) = read_records(&path);

        assert_eq!(records.len(), 1);
        let message = error.unwrap().to_string();
        assert!(message.contains("line 2"), "{}", message);
    }

    #[test]
    fn test_read_records_missing_file() {
        let dir = TempDir::new().unwrap();
        let (records, error) = read_records(&dir.path().join("missing.jsonl"));
        assert!(records.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn test_failed_result_has_two_keys() {
        let result = BatchResult::Failed {
            id: Some("x".to_string()),
            final_answer: "boom".to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, serde_json::json!({"id": "x", "final_answer": "boom"}));
    }

    #[test]
    fn test_fail_batch_writes_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.jsonl");
        let output = dir.path().join("out.jsonl");
        fs::write(
            &input,
            "{\"id\": \"a\", \"question\": \"q1\"}\n{\"id\": \"b\"}\n",
        )
        .unwrap();

        let summary = fail_batch(&input, &output, "Document directory not found").unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 2);
        assert!(summary.read_error.is_none());
        let lines: Vec<serde_json::Value> = fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(
            lines,
            vec![
                serde_json::json!({"id": "a", "final_answer": "Document directory not found"}),
                serde_json::json!({"id": "b", "final_answer": "Document directory not found"}),
            ]
        );
    }

    #[test]
    fn test_fail_batch_with_missing_input_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.jsonl");

        let summary = fail_batch(&dir.path().join("missing.jsonl"), &output, "boom").unwrap();

        assert_eq!(summary.total, 0);
        assert!(summary.read_error.is_some());
        assert_eq!(fs::read_to_string(&output).unwrap(), "");
    }

    #[test]
    fn test_write_results_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/nested/results.jsonl");

        write_results(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
