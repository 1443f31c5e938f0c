//! Ollama `/api/generate` client

use super::{LlmClient, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct OllamaClient {
    url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaClient {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        debug!("Calling ollama model {}", self.model);

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .timeout(timeout)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Unavailable(format!(
                "ollama error ({}): {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::from_reqwest(e, timeout))?;
        body.into_text()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, LlmError> {
        if let Some(error) = self.error {
            return Err(LlmError::Unavailable(error));
        }
        Ok(self.response.or(self.text).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_response_then_text() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"response":"SELECT 1","done":true}"#).unwrap();
        assert_eq!(body.into_text().unwrap(), "SELECT 1");

        let body: GenerateResponse = serde_json::from_str(r#"{"text":"SELECT 2"}"#).unwrap();
        assert_eq!(body.into_text().unwrap(), "SELECT 2");

        let body: GenerateResponse = serde_json::from_str(r#"{"error":"model not found"}"#).unwrap();
        assert_eq!(
            body.into_text().unwrap_err(),
            LlmError::Unavailable("model not found".to_string())
        );
    }
}
