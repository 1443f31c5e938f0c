//! Repair loop controller

use super::state::{AttemptClock, LoopState};
use crate::error::{CraftError, Result};
use crate::extract::SqlExtractor;
use crate::llm::{LlmClient, LlmError};
use crate::prompt::PromptBuilder;
use crate::session::{Attempt, CraftingSession};
use crate::validation::{SqlValidator, ValidationOutcome, Violation};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct RepairLoop {
    prompt_builder: PromptBuilder,
    extractor: Arc<dyn SqlExtractor>,
    validator: SqlValidator,
    llm: Arc<dyn LlmClient>,
    llm_timeout: Duration,
}

impl RepairLoop {
    pub fn new(
        prompt_builder: PromptBuilder,
        extractor: Arc<dyn SqlExtractor>,
        validator: SqlValidator,
        llm: Arc<dyn LlmClient>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            prompt_builder,
            extractor,
            validator,
            llm,
            llm_timeout,
        }
    }

    /// Drive `session` until it succeeds or runs out of attempts.
    ///
    /// Returns `Err(Cancelled)` as soon as `cancel` fires; the session is then left
    /// partially filled and should be discarded.
    pub async fn run(&self, session: &mut CraftingSession, cancel: &CancellationToken) -> Result<()> {
        let mut state = LoopState::Start;

        while !state.is_terminal() {
            let next = self.step(state, session, cancel).await?;
            debug!(
                session = %session.id,
                attempts = session.attempts().len(),
                "Repair loop -> {}",
                next.name()
            );
            state = next;
        }

        match state {
            LoopState::Succeeded => info!(
                session = %session.id,
                "✅ Query crafted after {} attempt(s)",
                session.attempts().len()
            ),
            _ => warn!(
                session = %session.id,
                "Could not craft a valid query after {} attempt(s)",
                session.attempts().len()
            ),
        }
        Ok(())
    }

    async fn step(
        &self,
        state: LoopState,
        session: &mut CraftingSession,
        cancel: &CancellationToken,
    ) -> Result<LoopState> {
        match state {
            LoopState::Start => {
                if session.remaining() == 0 {
                    return Ok(LoopState::Exhausted);
                }
                let prompt = self
                    .prompt_builder
                    .build(&session.schema, &session.question, session.attempts());
                Ok(LoopState::AwaitingLlm {
                    prompt,
                    clock: AttemptClock::start(),
                })
            }

            LoopState::AwaitingLlm { prompt, clock } => {
                if cancel.is_cancelled() {
                    return Err(CraftError::Cancelled);
                }
                let number = session.next_attempt_number();
                info!(
                    session = %session.id,
                    model = self.llm.model(),
                    "Attempt {} of {}: calling LLM",
                    number,
                    session.max_attempts()
                );

                match self.call_llm(&prompt, cancel).await? {
                    Ok(response) => Ok(LoopState::Validating {
                        prompt,
                        response,
                        clock,
                    }),
                    Err(e) => {
                        warn!(session = %session.id, "Attempt {} failed: {}", number, e);
                        session.record(Attempt {
                            number,
                            prompt,
                            response: None,
                            candidate: None,
                            outcome: ValidationOutcome::new(),
                            llm_error: Some(e),
                            started_at: clock.started_at,
                            elapsed_ms: clock.elapsed_ms(),
                        });
                        Ok(after_rejection(session))
                    }
                }
            }

            LoopState::Validating {
                prompt,
                response,
                clock,
            } => {
                if cancel.is_cancelled() {
                    return Err(CraftError::Cancelled);
                }
                let number = session.next_attempt_number();
                let candidate = self.extractor.extract(&response);
                let outcome = match &candidate {
                    Some(sql) => self.validator.validate(sql, &session.schema),
                    None => ValidationOutcome::from_violation(Violation::no_statement()),
                };
                if !outcome.is_valid() {
                    info!(
                        session = %session.id,
                        "Attempt {} rejected with {} violation(s)",
                        number,
                        outcome.len()
                    );
                }

                let accepted = outcome.is_valid() && candidate.is_some();
                session.record(Attempt {
                    number,
                    prompt,
                    response: Some(response),
                    candidate,
                    outcome,
                    llm_error: None,
                    started_at: clock.started_at,
                    elapsed_ms: clock.elapsed_ms(),
                });

                if accepted {
                    Ok(LoopState::Succeeded)
                } else {
                    Ok(after_rejection(session))
                }
            }

            terminal => Ok(terminal),
        }
    }

    /// One completion call, bounded by the timeout and raced against cancellation.
    async fn call_llm(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<std::result::Result<String, LlmError>> {
        let call = tokio::time::timeout(self.llm_timeout, self.llm.complete(prompt, self.llm_timeout));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CraftError::Cancelled),
            result = call => Ok(match result {
                Ok(inner) => inner,
                Err(_) => Err(LlmError::Timeout(self.llm_timeout)),
            }),
        }
    }
}

fn after_rejection(session: &CraftingSession) -> LoopState {
    if session.remaining() > 0 {
        LoopState::Start
    } else {
        LoopState::Exhausted
    }
}
