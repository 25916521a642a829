//! Confidence score and citations for a finished session.

use crate::state::{RouteDecision, SqlExecutionResult};
use hybrid_knowledge::DocumentChunk;

/// Scored result of [`aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Confidence {
    pub score: f64,
    pub citations: Vec<String>,
    pub retrieval_quality: f64,
    pub query_success: f64,
    pub rows_present: f64,
}

/// Score a session from what its route actually exercised.
///
/// Each dimension starts at 1.0 and is only lowered by the path that
/// measures it. A dimension the route never touched keeps 1.0 and still
/// counts toward the mean.
pub fn aggregate(
    route: RouteDecision,
    chunks: &[DocumentChunk],
    table_names: &[String],
    result: Option<&SqlExecutionResult>,
) -> Confidence {
    let mut citations = Vec::new();
    let mut retrieval_quality = 1.0;
    let mut query_success = 1.0;
    let mut rows_present = 1.0;

    if route.includes_documents() && !chunks.is_empty() {
        citations.extend(chunks.iter().map(DocumentChunk::citation));
        let total: f64 = chunks.iter().map(|c| c.score.unwrap_or(0.0)).sum();
        retrieval_quality = total / chunks.len() as f64;
    }

    if route.includes_query() && !table_names.is_empty() {
        citations.extend(table_names.iter().cloned());
        let has_error = result.is_some_and(SqlExecutionResult::has_error);
        let has_rows = result.is_some_and(SqlExecutionResult::has_rows);
        query_success = if has_error { 0.0 } else { 1.0 };
        rows_present = if has_rows { 1.0 } else { 0.0 };
    }

    let mean = (retrieval_quality + query_success + rows_present) / 3.0;

    Confidence {
        score: (mean * 1000.0).round() / 1000.0,
        citations,
        retrieval_quality,
        query_success,
        rows_present,
    }
}
