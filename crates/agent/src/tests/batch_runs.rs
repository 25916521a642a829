//! Batch runner against scripted collaborators.

use super::stubs::{build_agent, settings, ScriptedLlm, ScriptedStore};
use crate::batch::{run_batch, BatchResult};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn documents_only_llm() -> ScriptedLlm {
    ScriptedLlm::new()
        .always("router", json!({"route": "rag"}))
        .always(
            "synthesizer",
            json!({"final_answer": "14", "explanation": "Policy says so."}),
        )
}

fn read_output(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("questions.jsonl");
        let output = dir.path().join("out/answers.jsonl");
        fs::write(
            &input,
            concat!(
                "{\"id\": \"a\", \"question\": \"Return window for Beverages?\", \"format_hint\": \"int\"}\n",
                "{\"id\": \"b\"}\n",
                "\n",
                "{\"id\": \"c\", \"question\": \"Return window for Condiments?\", \"format_hint\": \"int\"}\n",
            ),
        )
        .unwrap();

        let (agent, _llm, _store) = build_agent(documents_only_llm(), ScriptedStore::new(), settings());
        let summary = run_batch(&agent, &input, &output, 1).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, 1);
        assert!(summary.read_error.is_none());

        let lines = read_output(&output);
        let ids: Vec<&str> = lines.iter().map(|v| v["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert_eq!(lines[0]["final_answer"], "14");
        assert!(lines[0].get("citations").is_some());
        assert_eq!(lines[1]["final_answer"], "Record has no question");
        assert_eq!(lines[1].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_writes_partial_output_on_bad_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("questions.jsonl");
        let output = dir.path().join("answers.jsonl");
        fs::write(
            &input,
            "{\"id\": \"a\", \"question\": \"Return window?\"}\n{broken\n{\"id\": \"c\", \"question\": \"q\"}\n",
        )
        .unwrap();

        let (agent, _llm, _store) = build_agent(documents_only_llm(), ScriptedStore::new(), settings());
        let summary = run_batch(&agent, &input, &output, 2).await.unwrap();

        assert_eq!(summary.total, 1);
        assert!(summary.read_error.unwrap().contains("line 2"));
        let lines = read_output(&output);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["id"], "a");
    }

    #[tokio::test]
    async fn test_batch_missing_input_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("answers.jsonl");

        let (agent, _llm, _store) = build_agent(documents_only_llm(), ScriptedStore::new(), settings());
        let summary = run_batch(&agent, &dir.path().join("missing.jsonl"), &output, 1)
            .await
            .unwrap();

        assert_eq!(summary.total, 0);
        assert!(summary.read_error.is_some());
        assert_eq!(fs::read_to_string(&output).unwrap(), "");
    }

    #[tokio::test]
    async fn test_batch_records_fatal_invocation_errors() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("questions.jsonl");
        let output = dir.path().join("answers.jsonl");
        fs::write(&input, "{\"id\": \"x\", \"question\": \"q\"}\n").unwrap();

        let mut limited = settings();
        limited.max_transitions = 1;
        let (agent, _llm, _store) = build_agent(documents_only_llm(), ScriptedStore::new(), limited);
        let summary = run_batch(&agent, &input, &output, 1).await.unwrap();

        assert_eq!(summary.failed, 1);
        let lines = read_output(&output);
        assert_eq!(lines[0]["id"], "x");
        assert!(lines[0]["final_answer"]
            .as_str()
            .unwrap()
            .contains("exceeding 1 transitions"));
    }

    #[tokio::test]
    async fn test_concurrent_batch_keeps_input_order() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("questions.jsonl");
        let output = dir.path().join("answers.jsonl");
        let body: String = (0..8)
            .map(|i| format!("{{\"id\": \"r{}\", \"question\": \"Return window {}?\"}}\n", i, i))
            .collect();
        fs::write(&input, body).unwrap();

        let (agent, _llm, _store) = build_agent(documents_only_llm(), ScriptedStore::new(), settings());
        let summary = run_batch(&agent, &input, &output, 4).await.unwrap();

        assert_eq!(summary.total, 8);
        assert_eq!(summary.failed, 0);

        let results: Vec<BatchResult> = fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        for (i, result) in results.iter().enumerate() {
            match result {
                BatchResult::Answered(output) => assert_eq!(output.id, format!("r{}", i)),
                BatchResult::Failed { .. } => panic!("record {} failed", i),
            }
        }
    }
}
