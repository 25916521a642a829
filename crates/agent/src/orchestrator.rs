//! The hybrid question-answering agent.

use crate::graph::{next_stage, Stage};
use crate::state::{AgentOutput, Session};
use crate::tools::{SqlStore, SqliteStore};
use hybrid_core::{AgentSettings, AppConfig, AppError, AppResult};
use hybrid_knowledge::{load_markdown_corpus, TfidfRetriever};
use hybrid_llm::{create_client, JsonCompleter, StructuredClient};
use hybrid_prompt::PromptLibrary;
use std::sync::Arc;
use tracing::Instrument;

/// Answers questions from documents, the database, or both.
///
/// One agent serves any number of concurrent invocations; each invocation
/// owns its own [`Session`].
pub struct HybridAgent {
    pub(crate) llm: Arc<dyn StructuredClient>,
    pub(crate) prompts: PromptLibrary,
    pub(crate) retriever: Arc<TfidfRetriever>,
    pub(crate) store: Arc<dyn SqlStore>,
    pub(crate) settings: AgentSettings,
}

impl HybridAgent {
    pub fn new(
        llm: Arc<dyn StructuredClient>,
        prompts: PromptLibrary,
        retriever: Arc<TfidfRetriever>,
        store: Arc<dyn SqlStore>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            llm,
            prompts,
            retriever,
            store,
            settings,
        }
    }

    /// Wire the configured provider, prompts, corpus and database.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let settings = config.agent.clone();
        let provider = config.provider.as_str();
        let provider_config = config.get_provider_config(provider);
        let api_key = config.resolve_api_key(provider);

        let client = create_client(
            provider,
            provider_config.and_then(|p| p.endpoint()),
            api_key.as_deref(),
            provider_config.and_then(|p| p.timeout()),
        )
        .map_err(AppError::Llm)?;

        tracing::info!("Using provider {} with model {}", provider, config.model);

        let llm = JsonCompleter::new(client, &config.model)
            .with_temperature(settings.temperature)
            .with_seed(settings.seed)
            .with_context_window(settings.context_window);

        let prompts = PromptLibrary::load(Some(config.workspace.as_path()))?;

        let docs_path = config.resolve_path(&settings.docs_path);
        let corpus = load_markdown_corpus(&docs_path)?;
        let retriever = TfidfRetriever::new(corpus, settings.retrieval_k);
        tracing::info!(
            "Indexed {} chunks ({} terms) from {:?}",
            retriever.len(),
            retriever.vocabulary_size(),
            docs_path
        );

        let database_path = config.resolve_path(&settings.database_path);
        if !database_path.exists() {
            tracing::warn!(
                "Database {:?} does not exist; query attempts will fail",
                database_path
            );
        }

        Ok(Self::new(
            Arc::new(llm),
            prompts,
            Arc::new(retriever),
            Arc::new(SqliteStore::new(database_path)),
            settings,
        ))
    }

    /// Answer one question.
    ///
    /// Collaborator failures degrade the answer instead of failing the call;
    /// the only error is exceeding the transition limit.
    pub async fn invoke(
        &self,
        id: &str,
        question: &str,
        format_hint: &str,
    ) -> AppResult<AgentOutput> {
        let session = Session::new(id, question, format_hint, self.settings.table_names.clone());
        let span = tracing::info_span!("invoke", id = %session.id, run_id = %session.run_id);

        let session = self.run(session).instrument(span).await?;
        Ok(session.into_output())
    }

    /// Drive `session` from Route to Terminal.
    pub async fn run(&self, mut session: Session) -> AppResult<Session> {
        let limit = self.settings.max_transitions;
        let mut stage = Stage::Route;
        let mut transitions = 0usize;

        tracing::info!("Question: {}", session.question);

        loop {
            tracing::debug!("Entering {:?}", stage);
            session.trail.push(stage);
            session = self.run_stage(stage, session).await;

            let next = next_stage(stage, &session)?;
            transitions += 1;
            if transitions > limit {
                tracing::error!("Exceeded {} transitions at {:?}", limit, stage);
                return Err(AppError::TransitionLimit { limit });
            }

            if next == Stage::Terminal {
                session.trail.push(Stage::Terminal);
                break;
            }
            stage = next;
        }

        tracing::info!(
            "Finished after {} transitions, {} attempts",
            transitions,
            session.attempt_count
        );
        Ok(session)
    }
}
