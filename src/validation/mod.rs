//! SQL Validator
//!
//! Checks a candidate statement against a schema snapshot and collects every
//! violation it can find. Never executes anything.

pub(crate) mod guards;
mod scope;
pub mod types;
pub mod violation;

pub use types::{Literal, TypeCategory};
pub use violation::{ValidationOutcome, Violation};

use crate::config::CrafterConfig;
use crate::error::CraftError;
use crate::schema::SchemaDescription;
use scope::Walker;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// SQL dialect used to parse candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    Generic,
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDialect {
    pub fn name(self) -> &'static str {
        match self {
            SqlDialect::Generic => "generic",
            SqlDialect::Postgres => "postgres",
            SqlDialect::MySql => "mysql",
            SqlDialect::Sqlite => "sqlite",
        }
    }

    /// Human-readable name used in prompts.
    pub fn display_name(self) -> &'static str {
        match self {
            SqlDialect::Generic => "ANSI SQL",
            SqlDialect::Postgres => "PostgreSQL",
            SqlDialect::MySql => "MySQL",
            SqlDialect::Sqlite => "SQLite",
        }
    }

    fn parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Generic => Box::new(GenericDialect {}),
            SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
            SqlDialect::MySql => Box::new(MySqlDialect {}),
            SqlDialect::Sqlite => Box::new(SQLiteDialect {}),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = CraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generic" | "ansi" => Ok(SqlDialect::Generic),
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "mysql" => Ok(SqlDialect::MySql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            other => Err(CraftError::Config(format!("unsupported SQL dialect: {}", other))),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    pub read_only: bool,
    pub reject_comments: bool,
    /// Lowercased table names; `None` means every schema table is allowed.
    pub allowed_tables: Option<BTreeSet<String>>,
    pub dialect: SqlDialect,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            read_only: true,
            reject_comments: true,
            allowed_tables: None,
            dialect: SqlDialect::default(),
        }
    }
}

impl From<&CrafterConfig> for ValidatorOptions {
    fn from(config: &CrafterConfig) -> Self {
        Self {
            read_only: config.read_only,
            reject_comments: config.reject_comments,
            allowed_tables: config.allowed_tables.clone(),
            dialect: config.dialect,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SqlValidator {
    options: ValidatorOptions,
}

impl SqlValidator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate `candidate` against `schema`.
    ///
    /// A parse failure stops the checks there; otherwise every statement-kind, table,
    /// column and type problem found is reported, in the order it was met.
    pub fn validate(&self, candidate: &str, schema: &SchemaDescription) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::new();

        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            outcome.push(Violation::no_statement());
            return outcome;
        }

        if self.options.reject_comments {
            if let Some(marker) = guards::find_comment(trimmed) {
                outcome.push(Violation::ForbiddenConstruct {
                    construct: format!("comment ({})", marker),
                });
            }
        }

        let dialect = self.options.dialect.parser_dialect();
        let statements = match Parser::parse_sql(dialect.as_ref(), trimmed) {
            Ok(statements) => statements,
            Err(e) => {
                debug!("Candidate failed to parse: {}", e);
                outcome.push(Violation::SyntaxError {
                    reason: e.to_string(),
                });
                return outcome;
            }
        };

        let statement = match statements.as_slice() {
            [] => {
                outcome.push(Violation::no_statement());
                return outcome;
            }
            [statement] => statement,
            [statement, ..] => {
                outcome.push(Violation::ForbiddenConstruct {
                    construct: format!("multiple statements ({})", statements.len()),
                });
                statement
            }
        };

        for statement in &statements {
            if !self.statement_allowed(statement) {
                outcome.push(Violation::ForbiddenStatementKind {
                    statement: statement_kind(statement, trimmed),
                });
            }
        }

        let mut walker = Walker::new(schema, self.options.allowed_tables.as_ref(), &mut outcome);
        walker.walk_statement(statement);

        outcome
    }

    fn statement_allowed(&self, statement: &Statement) -> bool {
        match statement {
            // SELECT ... INTO creates a table, so it counts as DDL.
            Statement::Query(query) => !selects_into(query),
            // Outside read-only mode plain DML is accepted; DDL and procedure calls never are.
            Statement::Insert { .. } | Statement::Update { .. } | Statement::Delete { .. } => {
                !self.options.read_only
            }
            _ => false,
        }
    }
}

/// Upper-case keyword naming the kind of `statement`.
fn statement_kind(statement: &Statement, sql: &str) -> String {
    match statement {
        Statement::Query(query) if selects_into(query) => "SELECT INTO".to_string(),
        Statement::Query(_) => "SELECT".to_string(),
        Statement::Insert { .. } => "INSERT".to_string(),
        Statement::Update { .. } => "UPDATE".to_string(),
        Statement::Delete { .. } => "DELETE".to_string(),
        _ => sql
            .split_whitespace()
            .next()
            .map(|word| word.trim_end_matches(';').to_uppercase())
            .unwrap_or_default(),
    }
}

/// True when any block of `query`, CTEs included, has an INTO clause.
fn selects_into(query: &Query) -> bool {
    let in_ctes = query
        .with
        .as_ref()
        .map_or(false, |with| with.cte_tables.iter().any(|cte| selects_into(&cte.query)));
    in_ctes || set_expr_selects_into(&query.body)
}

fn set_expr_selects_into(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_some(),
        SetExpr::Query(query) => selects_into(query),
        SetExpr::SetOperation { left, right, .. } => {
            set_expr_selects_into(left) || set_expr_selects_into(right)
        }
        _ => false,
    }
}
