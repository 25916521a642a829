//! LLM integration crate for the Hybrid Agent.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs), plus the structured-output layer the
//! orchestrator uses to get schema-checked JSON back from a model.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Groq**: Hosted OpenAI-compatible chat completions
//!
//! # Example
//! ```no_run
//! use hybrid_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod structured;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GroqClient, OllamaClient};
pub use structured::{complete_as, JsonCompleter, StructuredClient, StructuredOutput, StructuredRequest};
pub use types::ProviderType;
