//! Command handlers for the hybrid CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod batch;
pub mod search;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use batch::BatchCommand;
pub use search::SearchCommand;
