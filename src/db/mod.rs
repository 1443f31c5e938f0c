//! Database module for PostgreSQL schema introspection
//!
//! The crafting core only ever reads catalog metadata; crafted SQL is never executed here.

pub mod connection;
pub mod introspector;

pub use connection::lazy_pool;
pub use introspector::PgIntrospector;
