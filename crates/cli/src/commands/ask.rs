//! Ask command handler.
//!
//! Runs one question through the hybrid agent.

use clap::Args;
use hybrid_agent::{AgentOutput, HybridAgent};
use hybrid_core::{config::AppConfig, AppError, AppResult};

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Identifier echoed back in the output
    #[arg(long, default_value = "cli")]
    pub id: String,

    /// Shape of the expected answer (e.g. "int", "float", "{customer:str, margin:float}")
    #[arg(short = 'f', long, default_value = "str")]
    pub format_hint: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if self.question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        config.validate()?;
        let agent = HybridAgent::from_config(config)?;

        let output = agent
            .invoke(&self.id, &self.question, &self.format_hint)
            .await?;

        if self.json {
            let json = serde_json::to_string_pretty(&output)?;
            println!("{}", json);
        } else {
            print_text(&output);
        }

        Ok(())
    }
}

fn print_text(output: &AgentOutput) {
    println!("{}", output.final_answer);
    println!();

    if let Some(explanation) = &output.explanation {
        println!("Explanation: {}", explanation);
    }
    if let Some(sql) = &output.sql_query {
        println!("SQL: {}", sql);
    }
    println!("Confidence: {:.3}", output.confidence);

    if !output.citations.is_empty() {
        println!("Citations:");
        for citation in &output.citations {
            println!("  - {}", citation);
        }
    }
}
