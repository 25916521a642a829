//! Hybrid document + SQL question answering.
//!
//! A question is routed to the document corpus, the database, or both. The
//! stages run as an explicit state machine (see [`graph`]) over a [`Session`]
//! value, with bounded SQL retries and a deterministic confidence score.

pub mod batch;
pub mod confidence;
pub mod graph;
pub mod orchestrator;
pub mod retry;
pub mod state;
pub mod tools;

mod stages;

#[cfg(test)]
mod tests;

pub use batch::{fail_batch, read_records, run_batch, write_results, BatchRecord, BatchResult, BatchSummary};
pub use confidence::{aggregate, Confidence};
pub use graph::{next_stage, retry_outcome, Guard, RetryOutcome, Stage, RETRY_LIMIT, TRANSITIONS};
pub use orchestrator::HybridAgent;
pub use state::{
    AgentOutput, ConstraintPlan, RouteDecision, Session, SqlExecutionResult,
};
pub use tools::{SqlStore, SqliteStore};
