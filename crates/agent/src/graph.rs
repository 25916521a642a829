//! Stage topology.
//!
//! The workflow is a fixed table of `(from, guard, to)` edges. After a stage
//! runs, the first edge leaving it whose guard holds for the session decides
//! the next stage.

use crate::state::{RouteDecision, Session};
use hybrid_core::{AppError, AppResult};
use serde::Serialize;

/// Executions allowed to come back empty before giving up.
pub const RETRY_LIMIT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Route,
    RetrieveDocs,
    Plan,
    GenerateQuery,
    ExecuteQuery,
    CountAttempt,
    Synthesize,
    AggregateConfidence,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    RouteIncludesDocuments,
    RouteIsQueryOnly,
    RouteIsCombined,
    RouteIsDocumentOnly,
    RowsPresent,
    RetryAllowed,
    RetryExhausted,
}

/// What CountAttempt decides after an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Success,
    Retry,
    Fallback,
}

pub const TRANSITIONS: &[(Stage, Guard, Stage)] = &[
    (Stage::Route, Guard::RouteIncludesDocuments, Stage::RetrieveDocs),
    (Stage::Route, Guard::RouteIsQueryOnly, Stage::GenerateQuery),
    (Stage::RetrieveDocs, Guard::RouteIsCombined, Stage::Plan),
    (Stage::RetrieveDocs, Guard::RouteIsDocumentOnly, Stage::Synthesize),
    (Stage::Plan, Guard::Always, Stage::GenerateQuery),
    (Stage::GenerateQuery, Guard::Always, Stage::ExecuteQuery),
    (Stage::ExecuteQuery, Guard::Always, Stage::CountAttempt),
    (Stage::CountAttempt, Guard::RowsPresent, Stage::Synthesize),
    (Stage::CountAttempt, Guard::RetryAllowed, Stage::GenerateQuery),
    (Stage::CountAttempt, Guard::RetryExhausted, Stage::Synthesize),
    (Stage::Synthesize, Guard::Always, Stage::AggregateConfidence),
    (Stage::AggregateConfidence, Guard::Always, Stage::Terminal),
];

/// Success if the last execution returned rows, otherwise retry while the
/// attempt counter is within [`RETRY_LIMIT`].
pub fn retry_outcome(session: &Session) -> RetryOutcome {
    let rows_present = session
        .sql_result
        .as_ref()
        .is_some_and(|result| result.has_rows());

    if rows_present {
        RetryOutcome::Success
    } else if session.attempt_count <= RETRY_LIMIT {
        RetryOutcome::Retry
    } else {
        RetryOutcome::Fallback
    }
}

impl Guard {
    pub fn holds(self, session: &Session) -> bool {
        let route = session.route;
        match self {
            Guard::Always => true,
            Guard::RouteIncludesDocuments => route.is_some_and(RouteDecision::includes_documents),
            Guard::RouteIsQueryOnly => route == Some(RouteDecision::QueryOnly),
            Guard::RouteIsCombined => route == Some(RouteDecision::Combined),
            Guard::RouteIsDocumentOnly => route == Some(RouteDecision::DocumentOnly),
            Guard::RowsPresent => retry_outcome(session) == RetryOutcome::Success,
            Guard::RetryAllowed => retry_outcome(session) == RetryOutcome::Retry,
            Guard::RetryExhausted => retry_outcome(session) == RetryOutcome::Fallback,
        }
    }
}

/// Next stage after `stage`, given the session it produced.
pub fn next_stage(stage: Stage, session: &Session) -> AppResult<Stage> {
    TRANSITIONS
        .iter()
        .find(|(from, guard, _)| *from == stage && guard.holds(session))
        .map(|(_, _, to)| *to)
        .ok_or_else(|| {
            AppError::Workflow(format!(
                "No transition from {:?} (route {:?}, attempt {})",
                stage, session.route, session.attempt_count
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SqlExecutionResult;
    use serde_json::json;

    fn session(route: Option<RouteDecision>) -> Session {
        let mut session = Session::new("t", "question", "str", vec!["demo_orders".to_string()]);
        session.route = route;
        session
    }

    #[test]
    fn test_route_edges() {
        let docs = session(Some(RouteDecision::DocumentOnly));
        let sql = session(Some(RouteDecision::QueryOnly));
        let both = session(Some(RouteDecision::Combined));

        assert_eq!(next_stage(Stage::Route, &docs).unwrap(), Stage::RetrieveDocs);
        assert_eq!(next_stage(Stage::Route, &both).unwrap(), Stage::RetrieveDocs);
        assert_eq!(next_stage(Stage::Route, &sql).unwrap(), Stage::GenerateQuery);

        assert_eq!(next_stage(Stage::RetrieveDocs, &docs).unwrap(), Stage::Synthesize);
        assert_eq!(next_stage(Stage::RetrieveDocs, &both).unwrap(), Stage::Plan);
    }

    #[test]
    fn test_unconditional_edges() {
        let s = session(Some(RouteDecision::QueryOnly));
        assert_eq!(next_stage(Stage::Plan, &s).unwrap(), Stage::GenerateQuery);
        assert_eq!(next_stage(Stage::GenerateQuery, &s).unwrap(), Stage::ExecuteQuery);
        assert_eq!(next_stage(Stage::ExecuteQuery, &s).unwrap(), Stage::CountAttempt);
        assert_eq!(next_stage(Stage::Synthesize, &s).unwrap(), Stage::AggregateConfidence);
        assert_eq!(next_stage(Stage::AggregateConfidence, &s).unwrap(), Stage::Terminal);
    }

    #[test]
    fn test_retry_decisions_by_attempt() {
        let mut s = session(Some(RouteDecision::QueryOnly));
        s.sql_result = Some(SqlExecutionResult::failed("no such column: Revenue"));

        for (attempt, expected) in [
            (1, RetryOutcome::Retry),
            (2, RetryOutcome::Retry),
            (3, RetryOutcome::Fallback),
            (4, RetryOutcome::Fallback),
        ] {
            s.attempt_count = attempt;
            assert_eq!(retry_outcome(&s), expected, "attempt {}", attempt);
        }

        s.attempt_count = 2;
        assert_eq!(next_stage(Stage::CountAttempt, &s).unwrap(), Stage::GenerateQuery);
        s.attempt_count = 3;
        assert_eq!(next_stage(Stage::CountAttempt, &s).unwrap(), Stage::Synthesize);
    }

    #[test]
    fn test_rows_win_over_attempts() {
        let mut s = session(Some(RouteDecision::Combined));
        s.attempt_count = 3;
        s.sql_result = Some(SqlExecutionResult::rows(
            vec!["n".to_string()],
            vec![vec![json!(42)]],
        ));

        assert_eq!(retry_outcome(&s), RetryOutcome::Success);
        assert_eq!(next_stage(Stage::CountAttempt, &s).unwrap(), Stage::Synthesize);
    }

    #[test]
    fn test_empty_rows_without_error_still_retry() {
        let mut s = session(Some(RouteDecision::QueryOnly));
        s.attempt_count = 1;
        s.sql_result = Some(SqlExecutionResult::rows(vec!["n".to_string()], vec![]));
        assert_eq!(retry_outcome(&s), RetryOutcome::Retry);
    }

    #[test]
    fn test_missing_route_has_no_edge() {
        let s = session(None);
        assert!(matches!(
            next_stage(Stage::Route, &s),
            Err(AppError::Workflow(_))
        ));
        assert!(next_stage(Stage::Terminal, &s).is_err());
    }

    #[test]
    fn test_every_stage_but_terminal_has_an_exit() {
        for stage in [
            Stage::Route,
            Stage::RetrieveDocs,
            Stage::Plan,
            Stage::GenerateQuery,
            Stage::ExecuteQuery,
            Stage::CountAttempt,
            Stage::Synthesize,
            Stage::AggregateConfidence,
        ] {
            assert!(TRANSITIONS.iter().any(|(from, _, _)| *from == stage));
        }
        assert!(!TRANSITIONS.iter().any(|(from, _, _)| *from == Stage::Terminal));
    }
}
