//! LLM Client boundary
//!
//! The crafting core only needs a synchronous-style text completion: send a prompt,
//! get raw text back. Nothing about the response is assumed.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::LlmSettings;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LlmError {
    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM unavailable: {0}")]
    Unavailable(String),
}

impl LlmError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError>;

    /// Model identifier, for logs and diagnostics.
    fn model(&self) -> &str;
}

/// Build the configured provider.
pub fn client_from_settings(settings: &LlmSettings) -> Arc<dyn LlmClient> {
    match settings {
        LlmSettings::Ollama { url, model } => Arc::new(OllamaClient::new(url.clone(), model.clone())),
        LlmSettings::OpenAi {
            api_key,
            base_url,
            model,
        } => Arc::new(OpenAiClient::new(api_key.clone(), model.clone(), base_url.clone())),
    }
}
