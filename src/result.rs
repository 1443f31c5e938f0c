//! Result Packager
//!
//! Turns a finished session into the structured result handed back to the caller.

use crate::session::{Attempt, CraftingSession, SessionStatus};
use crate::validation::Violation;
use itertools::Itertools;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct CraftingResult {
    pub session_id: Uuid,
    pub status: SessionStatus,
    /// Accepted statement; only set when `status` is `Succeeded`.
    pub sql: Option<String>,
    pub attempts: u32,
    /// Every violation from every attempt, in order. Empty on success.
    pub violations: Vec<Violation>,
    pub message: Option<String>,
    /// One diagnostic line per attempt.
    pub notes: Vec<String>,
    pub elapsed_ms: u64,
}

impl CraftingResult {
    pub fn is_success(&self) -> bool {
        self.status == SessionStatus::Succeeded
    }
}

pub fn package(session: &CraftingSession) -> CraftingResult {
    let attempts = session.attempts();
    let notes = attempts.iter().map(note).collect();
    let elapsed_ms = attempts.iter().map(|a| a.elapsed_ms).sum();

    match session.accepted_sql() {
        Some(sql) => CraftingResult {
            session_id: session.id,
            status: SessionStatus::Succeeded,
            sql: Some(sql.to_string()),
            attempts: attempts.len() as u32,
            violations: Vec::new(),
            message: None,
            notes,
            elapsed_ms,
        },
        None => CraftingResult {
            session_id: session.id,
            status: SessionStatus::Failed,
            sql: None,
            attempts: attempts.len() as u32,
            violations: attempts
                .iter()
                .flat_map(|a| a.outcome.violations().iter().cloned())
                .collect(),
            message: Some(format!(
                "could not produce a valid query after {} attempts",
                attempts.len()
            )),
            notes,
            elapsed_ms,
        },
    }
}

fn note(attempt: &Attempt) -> String {
    if let Some(error) = &attempt.llm_error {
        return format!("attempt {}: {}", attempt.number, error);
    }
    if attempt.is_accepted() {
        return format!("attempt {}: accepted ({} ms)", attempt.number, attempt.elapsed_ms);
    }
    format!(
        "attempt {}: rejected: {}",
        attempt.number,
        attempt.outcome.violations().iter().join("; ")
    )
}
