use crate::llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CraftError {
    /// Schema introspection failed. Fatal to the session; the caller decides
    /// whether to retry the whole session later.
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Crafting session cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CraftError {
    fn from(err: sqlx::Error) -> Self {
        CraftError::SchemaUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CraftError>;
