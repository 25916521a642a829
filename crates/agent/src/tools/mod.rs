//! Collaborators the orchestrator calls out to.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::state::SqlExecutionResult;
use hybrid_core::AppResult;

/// Relational store the query path runs against.
///
/// `execute` distinguishes two failures:
/// - [`AppError::QueryExecution`](hybrid_core::AppError::QueryExecution)
///   carries the engine's message for a statement it rejected. The
///   orchestrator feeds that message back to the next generation attempt.
/// - Any other `Err` means the store could not be reached at all.
///
/// A store may also report a rejection as `Ok` with
/// [`SqlExecutionResult::error`] set; both are treated the same.
#[async_trait::async_trait]
pub trait SqlStore: Send + Sync {
    /// Human-readable column listing for `tables`.
    async fn describe_schema(&self, tables: &[String]) -> AppResult<String>;

    /// Run one statement.
    async fn execute(&self, sql: &str) -> AppResult<SqlExecutionResult>;
}
