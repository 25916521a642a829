//! Per-invocation session state and the values exchanged with stages.

use crate::graph::Stage;
use hybrid_core::AppResult;
use hybrid_knowledge::DocumentChunk;
use hybrid_llm::StructuredOutput;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDecision {
    /// Documents only
    #[serde(rename = "rag")]
    DocumentOnly,

    /// Database query only
    #[serde(rename = "sql")]
    QueryOnly,

    /// Documents first, then a query shaped by them
    #[serde(rename = "hybrid")]
    Combined,
}

impl RouteDecision {
    pub fn includes_documents(self) -> bool {
        matches!(self, Self::DocumentOnly | Self::Combined)
    }

    pub fn includes_query(self) -> bool {
        matches!(self, Self::QueryOnly | Self::Combined)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentOnly => "rag",
            Self::QueryOnly => "sql",
            Self::Combined => "hybrid",
        }
    }
}

/// Facts pulled out of retrieved documents to steer SQL generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintPlan {
    #[serde(default)]
    pub date_ranges: Option<Vec<String>>,

    #[serde(default)]
    pub kpis: Option<Vec<String>>,

    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

impl ConstraintPlan {
    pub fn is_empty(&self) -> bool {
        self.date_ranges.is_none() && self.kpis.is_none() && self.categories.is_none()
    }
}

impl StructuredOutput for ConstraintPlan {
    fn schema() -> Value {
        let list = json!({"type": ["array", "null"], "items": {"type": "string"}});
        json!({
            "type": "object",
            "properties": {
                "date_ranges": list,
                "kpis": list,
                "categories": list
            }
        })
    }
}

/// Outcome of running one statement.
///
/// An `error` means the engine rejected the statement (or it never ran);
/// `columns` and `rows` are then empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub error: Option<String>,
}

impl SqlExecutionResult {
    pub fn rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// True when an error with actual text is present.
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// Router stage output.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterOutput {
    pub route: RouteDecision,
}

impl StructuredOutput for RouterOutput {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "route": {"type": "string", "enum": ["rag", "sql", "hybrid"]}
            },
            "required": ["route"]
        })
    }
}

/// SQL generation stage output.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlGeneration {
    pub sql: String,
}

impl StructuredOutput for SqlGeneration {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {"sql": {"type": "string"}},
            "required": ["sql"]
        })
    }

    fn validate(&self) -> AppResult<()> {
        if self.sql.trim().is_empty() {
            return Err(hybrid_core::AppError::MalformedCompletion(
                "sql is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Synthesizer stage output.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesizerOutput {
    pub final_answer: String,
    pub explanation: String,
}

impl StructuredOutput for SynthesizerOutput {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "final_answer": {"type": "string"},
                "explanation": {"type": "string"}
            },
            "required": ["final_answer", "explanation"]
        })
    }
}

/// Everything one invocation knows. Each stage takes the session by value
/// and hands back the updated one.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub run_id: String,
    pub question: String,
    pub format_hint: String,
    pub table_names: Vec<String>,
    pub route: Option<RouteDecision>,
    pub retrieved_docs: Vec<DocumentChunk>,
    pub constraints: ConstraintPlan,
    pub sql_query: Option<String>,
    pub sql_result: Option<SqlExecutionResult>,

    /// Set when SQL generation failed; consumed by the next execution.
    pub generation_error: Option<String>,

    /// Completed execution attempts.
    pub attempt_count: u32,
    pub citations: Vec<String>,
    pub final_answer: Option<String>,
    pub explanation: Option<String>,
    pub confidence: Option<f64>,

    /// Stages visited, in order.
    pub trail: Vec<Stage>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        format_hint: impl Into<String>,
        table_names: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            run_id: uuid::Uuid::new_v4().to_string(),
            question: question.into(),
            format_hint: format_hint.into(),
            table_names,
            route: None,
            retrieved_docs: Vec::new(),
            constraints: ConstraintPlan::default(),
            sql_query: None,
            sql_result: None,
            generation_error: None,
            attempt_count: 0,
            citations: Vec::new(),
            final_answer: None,
            explanation: None,
            confidence: None,
            trail: Vec::new(),
        }
    }

    pub fn into_output(self) -> AgentOutput {
        AgentOutput {
            id: self.id,
            final_answer: self.final_answer.unwrap_or_default(),
            sql_query: self.sql_query,
            confidence: self.confidence.unwrap_or(0.0),
            explanation: self.explanation,
            citations: self.citations,
        }
    }
}

/// What an invocation returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub id: String,
    pub final_answer: String,
    pub sql_query: Option<String>,
    pub confidence: f64,
    pub explanation: Option<String>,
    pub citations: Vec<String>,
}
