//! OpenAI-compatible chat completions client

use super::{LlmClient, LlmError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_MESSAGE: &str = "You translate questions into SQL. Return only the SQL statement.";

#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_MESSAGE},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
        });

        // Reasoning models spend part of the budget on hidden reasoning tokens
        if self.model.starts_with("gpt-5") || self.model.contains("o1") {
            body["max_completion_tokens"] = serde_json::json!(2000);
        } else if self.model.starts_with("gpt-4") {
            body["max_completion_tokens"] = serde_json::json!(800);
        } else {
            body["max_tokens"] = serde_json::json!(800);
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        debug!("Calling {} ({} prompt bytes)", self.model, prompt.len());

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Unavailable(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::from_reqwest(e, timeout))?;

        parse_chat_response(&response_json)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_chat_response(response_json: &serde_json::Value) -> Result<String, LlmError> {
    if let Some(error) = response_json.get("error") {
        return Err(LlmError::Unavailable(format!("LLM API error: {}", error)));
    }

    let choice = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LlmError::Unavailable("No choices in LLM response".to_string()))?;

    match choice.get("finish_reason").and_then(|r| r.as_str()) {
        Some("length") => warn!("LLM response was truncated due to length limit"),
        Some("content_filter") => {
            return Err(LlmError::Unavailable(
                "LLM response was filtered by content policy".to_string(),
            ))
        }
        _ => {}
    }

    // Empty text is still a response; the extractor decides whether it holds SQL.
    Ok(choice["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}
