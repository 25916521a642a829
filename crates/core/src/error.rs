//! Error types for the Hybrid Agent.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, LLM, knowledge, prompt, database,
//! and workflow errors.
//!
//! Collaborator failures (`Unavailable`, `MalformedCompletion`,
//! `QueryExecution`) are caught at stage boundaries by the orchestrator and
//! folded into the session. `TransitionLimit` is the only error an invocation
//! returns to its caller.

use thiserror::Error;

/// Unified error type for the Hybrid Agent.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document corpus and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Relational store errors that are neither transport nor statement failures
    #[error("Database error: {0}")]
    Database(String),

    /// A collaborator could not be reached (connection or transport failure)
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    /// Structured output did not match the requested schema
    #[error("Malformed completion: {0}")]
    MalformedCompletion(String),

    /// The relational engine rejected a statement
    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    /// The orchestrator exceeded its per-invocation transition budget
    #[error("Workflow aborted after exceeding {limit} transitions")]
    TransitionLimit { limit: usize },

    /// The transition table had no edge for the current stage
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
