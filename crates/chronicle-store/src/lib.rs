//! Chronicle Store — PostgreSQL storage strategy.
//!
//! Persists event documents as JSONB and serves the repository's index
//! range queries with SQL.

pub mod pg_storage;
pub mod schema;
