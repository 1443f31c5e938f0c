//! Natural-language to SQL query crafting.
//!
//! A question and a schema go in; a validated SQL statement (or a structured account
//! of why none could be produced) comes out. The LLM is treated as an untrusted text
//! generator: every candidate is extracted, parsed and checked against the schema, and
//! rejected candidates are fed back for repair up to a bounded number of attempts.

pub mod config;
pub mod crafter;
pub mod db;
pub mod error;
pub mod extract;
pub mod llm;
pub mod prompt;
pub mod repair_loop;
pub mod result;
pub mod schema;
pub mod session;
pub mod validation;

pub use config::CrafterConfig;
pub use crafter::QueryCrafter;
pub use error::{CraftError, Result};
pub use extract::{HeuristicExtractor, SqlExtractor};
pub use llm::{LlmClient, LlmError};
pub use result::CraftingResult;
pub use schema::{SchemaCache, SchemaDescription, SchemaSource};
pub use session::SessionStatus;
pub use validation::{SqlValidator, ValidationOutcome, Violation};
