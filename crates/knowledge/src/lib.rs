//! Document knowledge for the hybrid agent.
//!
//! Loads a markdown corpus, splits it at headers, and ranks the resulting
//! chunks against questions with TF-IDF cosine similarity.

pub mod loader;
pub mod retriever;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use loader::{load_markdown_corpus, split_markdown, MarkdownSection};
pub use retriever::{tokenize, TfidfRetriever};
pub use types::DocumentChunk;
