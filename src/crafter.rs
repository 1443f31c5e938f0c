//! Query Crafter
//!
//! Inbound entry point: one call turns a question and a schema handle into a
//! structured result.

use crate::config::CrafterConfig;
use crate::error::{CraftError, Result};
use crate::extract::{HeuristicExtractor, SqlExtractor};
use crate::llm::{client_from_settings, LlmClient};
use crate::prompt::{PromptBuilder, PromptOptions};
use crate::repair_loop::RepairLoop;
use crate::result::{package, CraftingResult};
use crate::schema::SchemaSource;
use crate::session::CraftingSession;
use crate::validation::{SqlValidator, ValidatorOptions};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared, stateless between sessions; wrap in an `Arc` to serve many callers.
pub struct QueryCrafter {
    config: CrafterConfig,
    repair_loop: RepairLoop,
}

impl QueryCrafter {
    pub fn new(config: CrafterConfig, llm: Arc<dyn LlmClient>) -> Self {
        Self::with_extractor(config, llm, Arc::new(HeuristicExtractor::new()))
    }

    /// Use a custom extraction strategy.
    pub fn with_extractor(
        config: CrafterConfig,
        llm: Arc<dyn LlmClient>,
        extractor: Arc<dyn SqlExtractor>,
    ) -> Self {
        let repair_loop = RepairLoop::new(
            PromptBuilder::new(PromptOptions::from(&config)),
            extractor,
            SqlValidator::new(ValidatorOptions::from(&config)),
            llm,
            config.llm_timeout,
        );
        Self { config, repair_loop }
    }

    /// Crafter talking to the LLM provider named in `config`.
    pub fn from_config(config: CrafterConfig) -> Self {
        let llm = client_from_settings(&config.llm);
        Self::new(config, llm)
    }

    pub fn config(&self) -> &CrafterConfig {
        &self.config
    }

    pub async fn craft(&self, question: &str, schema: &dyn SchemaSource) -> Result<CraftingResult> {
        self.craft_with_cancel(question, schema, &CancellationToken::new())
            .await
    }

    /// Like [`craft`](Self::craft), abandoning the session when `cancel` fires.
    ///
    /// Schema failures surface as `Err(SchemaUnavailable)`; every other failure is a
    /// `Failed` result.
    pub async fn craft_with_cancel(
        &self,
        question: &str,
        schema: &dyn SchemaSource,
        cancel: &CancellationToken,
    ) -> Result<CraftingResult> {
        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CraftError::Cancelled),
            snapshot = schema.snapshot() => snapshot?,
        };

        let mut session = CraftingSession::new(question, snapshot, self.config.max_attempts);
        info!(
            session = %session.id,
            tables = session.schema.tables.len(),
            "Crafting query for: {}",
            question
        );

        self.repair_loop.run(&mut session, cancel).await?;
        Ok(package(&session))
    }
}
