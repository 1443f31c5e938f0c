//! PostgreSQL schema introspector
//!
//! Reads table, column and foreign-key metadata from `information_schema` for a single
//! schema. Every query runs under the configured timeout.

use crate::error::{CraftError, Result};
use crate::schema::{
    ColumnDescriptor, ForeignKey, SchemaDescription, SchemaIntrospector, TableDescriptor,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

const COLUMNS_QUERY: &str = r#"
    SELECT c.table_name::text AS table_name,
           c.column_name::text AS column_name,
           c.data_type::text AS data_type,
           c.udt_name::text AS udt_name,
           c.is_nullable::text AS is_nullable
    FROM information_schema.columns c
    JOIN information_schema.tables t
      ON t.table_schema = c.table_schema AND t.table_name = c.table_name
    WHERE c.table_schema = $1
      AND t.table_type IN ('BASE TABLE', 'VIEW')
    ORDER BY c.table_name, c.ordinal_position
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT kcu.table_name::text AS table_name,
           kcu.column_name::text AS column_name,
           ccu.table_name::text AS foreign_table,
           ccu.column_name::text AS foreign_column
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
      ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
      AND tc.table_schema = $1
    ORDER BY kcu.table_name, kcu.column_name
"#;

pub struct PgIntrospector {
    pool: PgPool,
    schema: String,
    timeout: Duration,
}

impl PgIntrospector {
    pub fn new(pool: PgPool, schema: impl Into<String>, timeout: Duration) -> Self {
        Self {
            pool,
            schema: schema.into(),
            timeout,
        }
    }

    async fn load(&self) -> Result<SchemaDescription> {
        let rows = sqlx::query(COLUMNS_QUERY)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        // BTreeMap keeps the snapshot ordered by table name regardless of row order.
        let mut tables: BTreeMap<String, TableDescriptor> = BTreeMap::new();
        for row in rows {
            let table_name: String = row.try_get("table_name")?;
            let column_name: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("data_type")?;
            let udt_name: String = row.try_get("udt_name")?;
            let is_nullable: String = row.try_get("is_nullable")?;

            tables
                .entry(table_name.clone())
                .or_insert_with(|| TableDescriptor::new(table_name))
                .columns
                .push(ColumnDescriptor {
                    name: column_name,
                    declared_type: declared_type(&data_type, &udt_name),
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                });
        }

        let fk_rows = sqlx::query(FOREIGN_KEYS_QUERY)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        for row in fk_rows {
            let table_name: String = row.try_get("table_name")?;
            let column_name: String = row.try_get("column_name")?;
            let foreign_table: String = row.try_get("foreign_table")?;
            let foreign_column: String = row.try_get("foreign_column")?;

            if let Some(table) = tables.get_mut(&table_name) {
                table.foreign_keys.insert(ForeignKey {
                    column: column_name,
                    references_table: foreign_table,
                    references_column: foreign_column,
                });
            } else {
                debug!("Skipping foreign key on unlisted table {}", table_name);
            }
        }

        Ok(SchemaDescription::new(tables.into_values().collect()))
    }
}

#[async_trait]
impl SchemaIntrospector for PgIntrospector {
    async fn introspect(&self) -> Result<SchemaDescription> {
        let schema = tokio::time::timeout(self.timeout, self.load())
            .await
            .map_err(|_| {
                CraftError::SchemaUnavailable(format!(
                    "introspection of schema '{}' timed out after {:?}",
                    self.schema, self.timeout
                ))
            })??;
        info!(
            "Introspected schema '{}': {} tables",
            self.schema,
            schema.tables.len()
        );
        Ok(schema)
    }
}

/// `information_schema` reports enums and other user types as `USER-DEFINED` and arrays
/// as `ARRAY`; the udt name is more useful in both cases.
fn declared_type(data_type: &str, udt_name: &str) -> String {
    match data_type {
        "USER-DEFINED" | "ARRAY" => udt_name.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_defined_types_use_udt_name() {
        assert_eq!(declared_type("USER-DEFINED", "order_status"), "order_status");
        assert_eq!(declared_type("ARRAY", "_int4"), "_int4");
        assert_eq!(declared_type("integer", "int4"), "integer");
    }
}
