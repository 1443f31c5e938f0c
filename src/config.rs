//! Crafter configuration
//!
//! Loaded from environment variables (a `.env` file is honoured by the binary), with
//! defaults matching a local Ollama + PostgreSQL deployment.

use crate::error::{CraftError, Result};
use crate::validation::SqlDialect;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmSettings {
    Ollama {
        url: String,
        model: String,
    },
    OpenAi {
        api_key: String,
        base_url: String,
        model: String,
    },
}

#[derive(Debug, Clone)]
pub struct CrafterConfig {
    pub max_attempts: u32,
    /// Only SELECT/WITH statements are accepted when set.
    pub read_only: bool,
    pub reject_comments: bool,
    /// Optional allowlist; tables outside it are rejected even if they exist.
    pub allowed_tables: Option<BTreeSet<String>>,
    pub dialect: SqlDialect,
    pub llm_timeout: Duration,
    pub introspection_timeout: Duration,
    pub prompt_max_tables: usize,
    pub prompt_max_columns: usize,
    pub schema_ttl: Option<Duration>,
    pub database_url: Option<String>,
    pub database_schema: String,
    pub llm: LlmSettings,
}

impl Default for CrafterConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            read_only: true,
            reject_comments: true,
            allowed_tables: None,
            dialect: SqlDialect::Postgres,
            llm_timeout: Duration::from_secs(30),
            introspection_timeout: Duration::from_secs(10),
            prompt_max_tables: 25,
            prompt_max_columns: 200,
            schema_ttl: Some(Duration::from_secs(300)),
            database_url: None,
            database_schema: "public".to_string(),
            llm: LlmSettings::Ollama {
                url: "http://localhost:11434".to_string(),
                model: "sqlcoder:7b".to_string(),
            },
        }
    }
}

impl CrafterConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_attempts = parse_or(&var("NL2SQL_MAX_ATTEMPTS"), "NL2SQL_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(CraftError::Config("NL2SQL_MAX_ATTEMPTS must be at least 1".to_string()));
        }

        let schema_ttl = match parse_or::<u64>(&var("NL2SQL_SCHEMA_TTL_SECS"), "NL2SQL_SCHEMA_TTL_SECS", 300)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let allowed_tables = var("NL2SQL_ALLOWED_TABLES").map(|list| {
            list.split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect::<BTreeSet<_>>()
        });

        let dialect = match var("NL2SQL_DIALECT") {
            Some(raw) => raw.parse()?,
            None => defaults.dialect,
        };

        Ok(Self {
            max_attempts,
            read_only: parse_bool(&var("NL2SQL_READ_ONLY"), "NL2SQL_READ_ONLY", defaults.read_only)?,
            reject_comments: parse_bool(
                &var("NL2SQL_REJECT_COMMENTS"),
                "NL2SQL_REJECT_COMMENTS",
                defaults.reject_comments,
            )?,
            allowed_tables,
            dialect,
            llm_timeout: Duration::from_secs(parse_or(
                &var("NL2SQL_LLM_TIMEOUT_SECS"),
                "NL2SQL_LLM_TIMEOUT_SECS",
                defaults.llm_timeout.as_secs(),
            )?),
            introspection_timeout: Duration::from_secs(parse_or(
                &var("NL2SQL_INTROSPECTION_TIMEOUT_SECS"),
                "NL2SQL_INTROSPECTION_TIMEOUT_SECS",
                defaults.introspection_timeout.as_secs(),
            )?),
            prompt_max_tables: parse_or(
                &var("NL2SQL_PROMPT_MAX_TABLES"),
                "NL2SQL_PROMPT_MAX_TABLES",
                defaults.prompt_max_tables,
            )?,
            prompt_max_columns: parse_or(
                &var("NL2SQL_PROMPT_MAX_COLUMNS"),
                "NL2SQL_PROMPT_MAX_COLUMNS",
                defaults.prompt_max_columns,
            )?,
            schema_ttl,
            database_url: var("DATABASE_URL"),
            database_schema: var("DATABASE_SCHEMA").unwrap_or(defaults.database_schema),
            llm: llm_settings(&var)?,
        })
    }
}

fn llm_settings<F>(var: &F) -> Result<LlmSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = var("NL2SQL_LLM_PROVIDER").unwrap_or_else(|| "ollama".to_string());
    match provider.to_lowercase().as_str() {
        "ollama" => Ok(LlmSettings::Ollama {
            url: var("OLLAMA_URL").unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: var("OLLAMA_MODEL").unwrap_or_else(|| "sqlcoder:7b".to_string()),
        }),
        "openai" => Ok(LlmSettings::OpenAi {
            api_key: var("OPENAI_API_KEY").ok_or_else(|| {
                CraftError::Config("OPENAI_API_KEY environment variable not set".to_string())
            })?,
            base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }),
        other => Err(CraftError::Config(format!(
            "unknown NL2SQL_LLM_PROVIDER '{}' (expected ollama or openai)",
            other
        ))),
    }
}

fn parse_or<T: FromStr>(raw: &Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| CraftError::Config(format!("{} has invalid value '{}'", key, value))),
        None => Ok(default),
    }
}

fn parse_bool(raw: &Option<String>, key: &str, default: bool) -> Result<bool> {
    match raw.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(CraftError::Config(format!("{} has invalid value '{}'", key, v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<CrafterConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CrafterConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_read_only_ollama() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert!(config.read_only);
        assert_eq!(config.dialect, SqlDialect::Postgres);
        assert!(matches!(config.llm, LlmSettings::Ollama { ref model, .. } if model == "sqlcoder:7b"));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("NL2SQL_MAX_ATTEMPTS", "5"),
            ("NL2SQL_READ_ONLY", "false"),
            ("NL2SQL_ALLOWED_TABLES", "Customers, orders,"),
            ("NL2SQL_SCHEMA_TTL_SECS", "0"),
            ("NL2SQL_LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
        ])
        .unwrap();
        assert_eq!(config.max_attempts, 5);
        assert!(!config.read_only);
        assert_eq!(config.schema_ttl, None);
        let allowed: Vec<_> = config.allowed_tables.unwrap().into_iter().collect();
        assert_eq!(allowed, vec!["customers", "orders"]);
        assert!(matches!(config.llm, LlmSettings::OpenAi { ref api_key, .. } if api_key == "sk-test"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("NL2SQL_MAX_ATTEMPTS", "0")]).is_err());
        assert!(config_from(&[("NL2SQL_MAX_ATTEMPTS", "three")]).is_err());
        assert!(config_from(&[("NL2SQL_READ_ONLY", "maybe")]).is_err());
        assert!(config_from(&[("NL2SQL_LLM_PROVIDER", "openai")]).is_err());
        assert!(config_from(&[("NL2SQL_DIALECT", "oracle")]).is_err());
    }
}
