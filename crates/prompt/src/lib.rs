//! Prompt system for the hybrid agent.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, built in or overridden per workspace
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, PromptLibrary, PLANNER, ROUTER, SQL, SYNTHESIZER};
pub use loader::{builtin_prompt, load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec};
