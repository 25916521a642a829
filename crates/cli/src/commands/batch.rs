//! Batch command handler.

use clap::Args;
use hybrid_agent::{fail_batch, run_batch, BatchSummary, HybridAgent};
use hybrid_core::{config::AppConfig, AppError, AppResult};
use std::path::PathBuf;

/// Answer every question in a JSONL file
#[derive(Args, Debug)]
pub struct BatchCommand {
    /// Input JSONL with one {"id", "question", "format_hint"} object per line
    #[arg(long)]
    pub batch: PathBuf,

    /// Output JSONL, one result per input record
    #[arg(long)]
    pub out: PathBuf,

    /// Questions answered at the same time
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,
}

impl BatchCommand {
    /// Execute the batch command.
    ///
    /// The output file is always written. If the agent cannot be set up,
    /// every record gets a failure line carrying the setup error and the
    /// command fails afterwards. It also fails if the input could not be
    /// read to the end.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing batch command");
        tracing::debug!("Batch command options: {:?}", self);

        let agent = match config.validate().and_then(|_| HybridAgent::from_config(config)) {
            Ok(agent) => agent,
            Err(e) => {
                tracing::error!("Agent setup failed: {}", e);
                let summary = fail_batch(&self.batch, &self.out, &e.to_string())?;
                self.report(&summary);
                return Err(e);
            }
        };

        let summary = run_batch(&agent, &self.batch, &self.out, self.concurrency).await?;
        self.report(&summary);

        match summary.read_error {
            Some(e) => Err(AppError::Other(format!(
                "Batch input {} was not fully read: {}",
                self.batch.display(),
                e
            ))),
            None => Ok(()),
        }
    }

    fn report(&self, summary: &BatchSummary) {
        println!(
            "Processed {} records ({} failed), results written to {}",
            summary.total,
            summary.failed,
            self.out.display()
        );
    }
}
