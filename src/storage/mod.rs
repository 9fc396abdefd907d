//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - socks(id, color, cotton_percentage, quantity), unique on (color, cotton_percentage)
//! - schema_migrations(version, name, checksum, applied_at)

pub mod migrations;
pub mod sqlite;

pub use migrations::{AppliedMigration, Migration, MIGRATIONS};
pub use sqlite::{SqliteStore, DbStats, is_constraint_violation, is_unique_violation};
