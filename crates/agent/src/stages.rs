//! Stage bodies.
//!
//! Every stage takes the session by value and returns it updated. Collaborator
//! failures are logged and folded into the session here, so a stage never
//! fails the invocation.

use crate::confidence;
use crate::graph::{retry_outcome, RetryOutcome, Stage};
use crate::orchestrator::HybridAgent;
use crate::retry;
use crate::state::{
    ConstraintPlan, RouteDecision, RouterOutput, Session, SqlExecutionResult, SqlGeneration,
    SynthesizerOutput,
};
use hybrid_core::{AppError, AppResult};
use hybrid_knowledge::DocumentChunk;
use hybrid_llm::{complete_as, StructuredOutput};
use hybrid_prompt::{PLANNER, ROUTER, SQL, SYNTHESIZER};
use std::collections::HashMap;

fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn join_chunks(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl HybridAgent {
    pub(crate) async fn run_stage(&self, stage: Stage, session: Session) -> Session {
        match stage {
            Stage::Route => self.route(session).await,
            Stage::RetrieveDocs => self.retrieve_docs(session),
            Stage::Plan => self.plan(session).await,
            Stage::GenerateQuery => self.generate_query(session).await,
            Stage::ExecuteQuery => self.execute_query(session).await,
            Stage::CountAttempt => self.count_attempt(session),
            Stage::Synthesize => self.synthesize(session).await,
            Stage::AggregateConfidence => self.aggregate_confidence(session),
            Stage::Terminal => session,
        }
    }

    /// Render prompt `id` and ask the model for a `T`.
    async fn ask<T: StructuredOutput>(
        &self,
        id: &str,
        name: &str,
        variables: HashMap<String, String>,
    ) -> AppResult<T> {
        let built = self.prompts.render(id, variables)?;
        complete_as::<T>(self.llm.as_ref(), name, built.system, built.user).await
    }

    async fn route(&self, mut session: Session) -> Session {
        let route = match self
            .ask::<RouterOutput>(ROUTER, "router", vars([("question", session.question.clone())]))
            .await
        {
            Ok(out) => out.route,
            Err(e) => {
                tracing::warn!("Routing failed, using both paths: {}", e);
                RouteDecision::Combined
            }
        };

        tracing::info!("Route: {}", route.as_str());
        session.route = Some(route);
        session
    }

    fn retrieve_docs(&self, mut session: Session) -> Session {
        session.retrieved_docs = self
            .retriever
            .query(&session.question, Some(self.settings.retrieval_k));

        let scores: Vec<f64> = session
            .retrieved_docs
            .iter()
            .filter_map(|chunk| chunk.score)
            .collect();
        tracing::info!(
            "Retrieved {} chunks, scores {:?}",
            session.retrieved_docs.len(),
            scores
        );
        session
    }

    async fn plan(&self, mut session: Session) -> Session {
        let chunks = join_chunks(&session.retrieved_docs);

        session.constraints = match self
            .ask::<ConstraintPlan>(PLANNER, "planner", vars([("chunks", chunks)]))
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Planning failed, continuing without constraints: {}", e);
                ConstraintPlan::default()
            }
        };

        tracing::info!("Constraints: {:?}", session.constraints);
        session
    }

    async fn generate_query(&self, mut session: Session) -> Session {
        let schema = match self.store.describe_schema(&session.table_names).await {
            Ok(schema) => schema,
            Err(e) => {
                tracing::error!("Schema lookup failed: {}", e);
                String::new()
            }
        };

        // Prior SQL and error are only shown to the model on a retry.
        let (previous_sql, error) = if session.attempt_count > 0 {
            let error = match &session.sql_result {
                Some(result) if result.has_error() => result.error.clone().unwrap_or_default(),
                Some(_) => "The previous query returned no rows.".to_string(),
                None => String::new(),
            };
            (session.sql_query.clone().unwrap_or_default(), error)
        } else {
            (String::new(), String::new())
        };

        let constraints = serde_json::to_string(&session.constraints).unwrap_or_default();

        let variables = vars([
            ("schema", schema),
            ("constraints", constraints),
            ("question", session.question.clone()),
            ("previous_sql", previous_sql),
            ("error", error),
        ]);

        match self.ask::<SqlGeneration>(SQL, "sql", variables).await {
            Ok(generation) => {
                tracing::info!(attempt = session.attempt_count + 1, "SQL: {}", generation.sql);
                session.sql_query = Some(generation.sql);
                session.generation_error = None;
            }
            Err(e) => {
                tracing::error!("SQL generation failed: {}", e);
                session.generation_error = Some(e.to_string());
            }
        }

        session
    }

    async fn execute_query(&self, mut session: Session) -> Session {
        let result = if let Some(error) = session.generation_error.take() {
            SqlExecutionResult::failed(error)
        } else if let Some(sql) = session.sql_query.as_deref() {
            match self.store.execute(sql).await {
                Ok(result) => result,
                Err(AppError::QueryExecution(message)) => {
                    tracing::warn!("Statement rejected: {}", message);
                    SqlExecutionResult::failed(message)
                }
                Err(e) => {
                    tracing::error!("Query execution failed: {}", e);
                    SqlExecutionResult::failed(e.to_string())
                }
            }
        } else {
            SqlExecutionResult::failed("No SQL query was generated")
        };

        tracing::info!(
            "Execution: {} rows, error {:?}",
            result.rows.len(),
            result.error
        );
        session.sql_result = Some(result);
        session
    }

    fn count_attempt(&self, session: Session) -> Session {
        let mut session = retry::increment(session);
        let outcome = retry_outcome(&session);
        tracing::info!("Attempt {} -> {:?}", session.attempt_count, outcome);

        // Giving up on an empty result counts as a failed query.
        if outcome == RetryOutcome::Fallback {
            let attempts = session.attempt_count;
            if let Some(result) = session.sql_result.as_mut() {
                if !result.has_error() {
                    *result = SqlExecutionResult::failed(format!(
                        "Query returned no rows after {} attempts",
                        attempts
                    ));
                }
            }
        }

        session
    }

    async fn synthesize(&self, mut session: Session) -> Session {
        let sql_output = match &session.sql_result {
            Some(result) => serde_json::to_string(result).unwrap_or_default(),
            None => "{}".to_string(),
        };

        let variables = vars([
            ("format_hint", session.format_hint.clone()),
            ("question", session.question.clone()),
            ("rag_output", join_chunks(&session.retrieved_docs)),
            ("sql_output", sql_output),
        ]);

        match self
            .ask::<SynthesizerOutput>(SYNTHESIZER, "synthesizer", variables)
            .await
        {
            Ok(out) => {
                tracing::info!("Final answer: {}", out.final_answer);
                session.final_answer = Some(out.final_answer);
                session.explanation = Some(out.explanation);
            }
            Err(e) => {
                tracing::error!("Synthesis failed: {}", e);
                let message = format!("Unable to synthesize an answer: {}", e);
                session.final_answer = Some(message.clone());
                session.explanation = Some(message);
            }
        }

        session
    }

    fn aggregate_confidence(&self, mut session: Session) -> Session {
        let route = session.route.unwrap_or(RouteDecision::Combined);
        let scored = confidence::aggregate(
            route,
            &session.retrieved_docs,
            &session.table_names,
            session.sql_result.as_ref(),
        );

        tracing::info!(
            "Confidence {} (retrieval {:.4}, query {}, rows {})",
            scored.score,
            scored.retrieval_quality,
            scored.query_success,
            scored.rows_present
        );
        session.citations = scored.citations;
        session.confidence = Some(scored.score);
        session
    }
}
