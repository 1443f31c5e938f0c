//! Violations and validation outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// A specific reason a candidate statement was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    SyntaxError {
        reason: String,
    },
    ForbiddenStatementKind {
        statement: String,
    },
    /// Comments, stacked statements and similar constructs refused for safety.
    ForbiddenConstruct {
        construct: String,
    },
    UnknownTable {
        table: String,
    },
    /// The table exists but is outside the configured allowlist.
    DisallowedTable {
        table: String,
    },
    UnknownColumn {
        column: String,
        table: Option<String>,
    },
    TypeMismatch {
        column: String,
        declared_type: String,
        other: String,
    },
}

impl Violation {
    pub fn no_statement() -> Self {
        Violation::SyntaxError {
            reason: "no statement found".to_string(),
        }
    }

    pub fn unknown_table(table: impl Into<String>) -> Self {
        Violation::UnknownTable {
            table: table.into(),
        }
    }

    pub fn unknown_column(column: impl Into<String>) -> Self {
        Violation::UnknownColumn {
            column: column.into(),
            table: None,
        }
    }

    /// Short machine-friendly name of the violation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Violation::SyntaxError { .. } => "syntax_error",
            Violation::ForbiddenStatementKind { .. } => "forbidden_statement_kind",
            Violation::ForbiddenConstruct { .. } => "forbidden_construct",
            Violation::UnknownTable { .. } => "unknown_table",
            Violation::DisallowedTable { .. } => "disallowed_table",
            Violation::UnknownColumn { .. } => "unknown_column",
            Violation::TypeMismatch { .. } => "type_mismatch",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::SyntaxError { reason } => write!(f, "syntax error: {}", reason),
            Violation::ForbiddenStatementKind { statement } => {
                write!(f, "{} statements are not allowed", statement)
            }
            Violation::ForbiddenConstruct { construct } => {
                write!(f, "forbidden construct: {}", construct)
            }
            Violation::UnknownTable { table } => write!(f, "unknown table \"{}\"", table),
            Violation::DisallowedTable { table } => {
                write!(f, "table \"{}\" is not in the list of allowed tables", table)
            }
            Violation::UnknownColumn {
                column,
                table: Some(table),
            } => write!(f, "unknown column \"{}\" in table \"{}\"", column, table),
            Violation::UnknownColumn { column, table: None } => {
                write!(f, "unknown column \"{}\"", column)
            }
            Violation::TypeMismatch {
                column,
                declared_type,
                other,
            } => write!(
                f,
                "type mismatch: column \"{}\" ({}) is compared with {}",
                column, declared_type, other
            ),
        }
    }
}

/// Ordered, de-duplicated set of violations. Empty means the candidate is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationOutcome {
    violations: Vec<Violation>,
}

impl ValidationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_violation(violation: Violation) -> Self {
        let mut outcome = Self::new();
        outcome.push(violation);
        outcome
    }

    pub fn push(&mut self, violation: Violation) {
        if !self.violations.contains(&violation) {
            self.violations.push(violation);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl<'a> IntoIterator for &'a ValidationOutcome {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}
