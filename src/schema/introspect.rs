//! Schema Introspection
//!
//! Read-only discovery of schema metadata. The PostgreSQL implementation lives in
//! `crate::db::introspector`; a JSON file source is provided for offline use.

use super::SchemaDescription;
use crate::error::{CraftError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Produce a fresh snapshot. Any failure is reported as
    /// [`CraftError::SchemaUnavailable`].
    async fn introspect(&self) -> Result<SchemaDescription>;
}

/// Schema description stored as JSON on disk.
pub struct JsonSchemaFile {
    path: PathBuf,
}

impl JsonSchemaFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<SchemaDescription> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            CraftError::SchemaUnavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let schema: SchemaDescription = serde_json::from_str(&raw).map_err(|e| {
            CraftError::SchemaUnavailable(format!("invalid schema file {}: {}", self.path.display(), e))
        })?;
        info!("Loaded {} tables from {}", schema.tables.len(), self.path.display());
        Ok(schema)
    }
}

#[async_trait]
impl SchemaIntrospector for JsonSchemaFile {
    async fn introspect(&self) -> Result<SchemaDescription> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableDescriptor;
    use std::io::Write;

    #[tokio::test]
    async fn loads_schema_from_file() {
        let schema = SchemaDescription::new(vec![TableDescriptor::new("users")
            .column("id", "int", false)
            .column("name", "text", true)]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&schema).unwrap().as_bytes())
            .unwrap();

        let loaded = JsonSchemaFile::new(file.path()).introspect().await.unwrap();
        assert_eq!(loaded, schema);
    }

    #[tokio::test]
    async fn missing_file_is_schema_unavailable() {
        let err = JsonSchemaFile::new("/nonexistent/schema.json")
            .introspect()
            .await
            .unwrap_err();
        assert!(matches!(err, CraftError::SchemaUnavailable(_)));
    }
}
