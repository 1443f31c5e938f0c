//! Database connection management using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Pool that connects on first use, so building a crafter never blocks on the database.
///
/// `acquire_timeout` bounds how long introspection may wait for a connection.
pub fn lazy_pool(database_url: &str, acquire_timeout: Duration) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(acquire_timeout)
        .connect_lazy(database_url)
}
