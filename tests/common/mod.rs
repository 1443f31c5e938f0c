#![allow(dead_code)]

use async_trait::async_trait;
use nl2sql_crafter::config::CrafterConfig;
use nl2sql_crafter::llm::{LlmClient, LlmError};
use nl2sql_crafter::schema::{SchemaDescription, TableDescriptor};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted reply for one LLM call.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(LlmError),
    /// Never answers; only a timeout or cancellation ends the call.
    Hang,
}

/// In-memory LLM that plays back a script, repeating the last entry once it runs out.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Reply::Text(t.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn next_reply(&self) -> Reply {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        match script.pop_front() {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last.clone().unwrap_or(Reply::Fail(LlmError::Unavailable("empty script".to_string()))),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, prompt: &str, _timeout: Duration) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.next_reply() {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// `users(id int, name text)`.
pub fn users_schema() -> Arc<SchemaDescription> {
    Arc::new(SchemaDescription::new(vec![TableDescriptor::new("users")
        .column("id", "int", false)
        .column("name", "text", true)]))
}

pub fn shop_schema() -> Arc<SchemaDescription> {
    Arc::new(SchemaDescription::new(vec![
        TableDescriptor::new("users")
            .column("id", "integer", false)
            .column("name", "text", false)
            .column("email", "character varying", true)
            .column("created_at", "timestamp with time zone", false),
        TableDescriptor::new("orders")
            .column("id", "integer", false)
            .column("user_id", "integer", false)
            .column("total", "numeric(10,2)", false)
            .column("status", "text", false)
            .column("placed_at", "date", false)
            .foreign_key("user_id", "users", "id"),
        TableDescriptor::new("order_items")
            .column("order_id", "integer", false)
            .column("product", "text", false)
            .column("quantity", "integer", false)
            .foreign_key("order_id", "orders", "id"),
    ]))
}

pub fn config(max_attempts: u32) -> CrafterConfig {
    CrafterConfig {
        max_attempts,
        llm_timeout: Duration::from_millis(200),
        ..CrafterConfig::default()
    }
}
