//! Repair loop states

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Start time of the attempt in flight.
#[derive(Debug, Clone, Copy)]
pub struct AttemptClock {
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl AttemptClock {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

#[derive(Debug, Clone)]
pub enum LoopState {
    /// Ready to build the next prompt.
    Start,
    AwaitingLlm {
        prompt: String,
        clock: AttemptClock,
    },
    Validating {
        prompt: String,
        response: String,
        clock: AttemptClock,
    },
    Succeeded,
    Exhausted,
}

impl LoopState {
    pub fn name(&self) -> &'static str {
        match self {
            LoopState::Start => "start",
            LoopState::AwaitingLlm { .. } => "awaiting_llm",
            LoopState::Validating { .. } => "validating",
            LoopState::Succeeded => "succeeded",
            LoopState::Exhausted => "exhausted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Succeeded | LoopState::Exhausted)
    }
}
