//! Schema Description
//!
//! Immutable snapshot of the target database's tables, columns and foreign keys.
//! A snapshot is taken once per crafting session and shared read-only.

pub mod cache;
pub mod introspect;

pub use cache::{SchemaCache, SchemaSource};
pub use introspect::{JsonSchemaFile, SchemaIntrospector};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub foreign_keys: BTreeSet<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// `column` of the owning table references `references_table.references_column`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

impl SchemaDescription {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }

    /// Case-insensitive table lookup.
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: BTreeSet::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, declared_type: impl Into<String>, nullable: bool) -> Self {
        self.columns.push(ColumnDescriptor {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable,
        });
        self
    }

    pub fn foreign_key(
        mut self,
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.insert(ForeignKey {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        });
        self
    }

    /// Case-insensitive column lookup.
    pub fn find_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}
