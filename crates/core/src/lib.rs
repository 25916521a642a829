//! Hybrid Agent Core Library
//!
//! This crate provides the foundational utilities shared by every crate in
//! the workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (including the agent settings)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AgentSettings, AppConfig};
pub use error::{AppError, AppResult};
