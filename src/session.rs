//! Crafting session state
//!
//! One session per question. Attempts are appended in order and never modified.

use crate::llm::LlmError;
use crate::schema::SchemaDescription;
use crate::validation::ValidationOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Succeeded,
    Failed,
}

/// One prompt → LLM → extract → validate cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub number: u32,
    pub prompt: String,
    /// Raw model text; `None` when the LLM call failed.
    pub response: Option<String>,
    pub candidate: Option<String>,
    pub outcome: ValidationOutcome,
    pub llm_error: Option<LlmError>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl Attempt {
    /// A candidate was produced and passed every check.
    pub fn is_accepted(&self) -> bool {
        self.candidate.is_some() && self.llm_error.is_none() && self.outcome.is_valid()
    }

    /// The model answered, whether or not the answer was usable.
    pub fn was_answered(&self) -> bool {
        self.response.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CraftingSession {
    pub id: Uuid,
    pub question: String,
    pub schema: Arc<SchemaDescription>,
    attempts: Vec<Attempt>,
    status: SessionStatus,
    max_attempts: u32,
}

impl CraftingSession {
    pub fn new(question: impl Into<String>, schema: Arc<SchemaDescription>, max_attempts: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            schema,
            attempts: Vec::new(),
            status: SessionStatus::Pending,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts.len() as u32)
    }

    pub fn next_attempt_number(&self) -> u32 {
        self.attempts.len() as u32 + 1
    }

    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    /// Append a finished attempt and settle the status once it is decided.
    ///
    /// Attempts beyond `max_attempts` or after the session settled are ignored, so the
    /// attempt count can never exceed the bound.
    pub fn record(&mut self, attempt: Attempt) -> bool {
        if self.status != SessionStatus::Pending || self.remaining() == 0 {
            return false;
        }
        let accepted = attempt.is_accepted();
        self.attempts.push(attempt);
        if accepted {
            self.status = SessionStatus::Succeeded;
        } else if self.remaining() == 0 {
            self.status = SessionStatus::Failed;
        }
        true
    }

    /// Accepted SQL, if the session succeeded.
    pub fn accepted_sql(&self) -> Option<&str> {
        match self.status {
            SessionStatus::Succeeded => self.last_attempt().and_then(|a| a.candidate.as_deref()),
            _ => None,
        }
    }
}
