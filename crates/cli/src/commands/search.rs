//! Search command handler.
//!
//! Ranks corpus chunks against a query with the same retriever the agent
//! uses. No model is called.

use clap::Args;
use hybrid_core::{config::AppConfig, AppResult};
use hybrid_knowledge::{load_markdown_corpus, DocumentChunk, TfidfRetriever};

/// Rank document chunks against a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of chunks to return (default: configured retrievalK)
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    /// Execute the search command.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");

        let docs_path = config.resolve_path(&config.agent.docs_path);
        let corpus = load_markdown_corpus(&docs_path)?;
        let retriever = TfidfRetriever::new(corpus, config.agent.retrieval_k);

        let results = retriever.query(&self.query, self.k);

        if self.json {
            let json = serde_json::to_string_pretty(&results)?;
            println!("{}", json);
        } else {
            print_results(&results);
        }

        Ok(())
    }
}

fn print_results(results: &[DocumentChunk]) {
    if results.is_empty() {
        println!("No documents indexed.");
        return;
    }

    for (rank, chunk) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {}",
            rank + 1,
            chunk.score.unwrap_or(0.0),
            chunk.citation()
        );
        if !chunk.headers.is_empty() {
            println!("   {}", chunk.headers.join(" > "));
        }
        let preview: String = chunk.content.chars().take(160).collect();
        println!("   {}", preview.replace('\n', " "));
        println!();
    }
}
