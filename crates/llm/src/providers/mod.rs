//! Concrete LLM provider clients.

pub mod groq;
pub mod ollama;

pub use groq::GroqClient;
pub use ollama::OllamaClient;
