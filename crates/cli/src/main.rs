//! Hybrid Agent CLI
//!
//! Main entry point for the hybrid command-line tool.
//! Answers analytical questions from markdown documents, a SQLite database,
//! or both.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, BatchCommand, SearchCommand};
use hybrid_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Hybrid Agent CLI - questions answered from documents and SQL
#[derive(Parser, Debug)]
#[command(name = "hybrid")]
#[command(about = "Answer analytical questions from documents and a SQLite database", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "HYBRID_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "HYBRID_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, groq)
    #[arg(short, long, global = true, env = "HYBRID_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "HYBRID_MODEL")]
    model: Option<String>,

    /// Markdown corpus directory
    #[arg(long, global = true, env = "HYBRID_DOCS_PATH")]
    docs: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "HYBRID_DATABASE_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question
    Ask(AskCommand),

    /// Answer every question in a JSONL file
    Batch(BatchCommand),

    /// Rank document chunks against a query without calling a model
    Search(SearchCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config
        .with_overrides(
            cli.workspace,
            cli.config,
            cli.provider,
            cli.model,
            cli.log_level,
            cli.verbose,
            cli.no_color,
        )
        .with_data_paths(cli.docs, cli.database);

    // Initialize logging with final configuration
    let log_file = config.log_file.as_deref().map(|p| config.resolve_path(p));
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_file.as_deref())?;

    // Log startup
    tracing::info!("Hybrid Agent CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Batch(_) => "batch",
        Commands::Search(_) => "search",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Batch(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config),
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
