//! Attempt counter.

use crate::state::Session;

/// Advance the attempt counter by one completed execution.
pub fn increment(mut session: Session) -> Session {
    session.attempt_count = session.attempt_count.saturating_add(1);
    session
}
