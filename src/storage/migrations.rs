//! Versioned schema migrations
//!
//! Migrations are applied in ascending version order, each inside its own
//! transaction. Every applied migration is recorded in `schema_migrations`
//! together with a blake3 checksum of its SQL; an applied migration whose
//! SQL has since changed is refused.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use crate::{Error, Result};

/// A single versioned schema change
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    /// Hex-encoded blake3 digest of the migration SQL
    pub fn checksum(&self) -> String {
        blake3::hash(self.sql.as_bytes()).to_hex().to_string()
    }
}

/// SQL to create the bookkeeping table
const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    checksum TEXT NOT NULL,
    applied_at INTEGER NOT NULL
)
"#;

/// All migrations shipped with this build, in version order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_socks",
        sql: r#"
CREATE TABLE socks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    color TEXT NOT NULL,
    cotton_percentage INTEGER NOT NULL CHECK (cotton_percentage BETWEEN 0 AND 100),
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    UNIQUE(color, cotton_percentage)
);
"#,
    },
    Migration {
        version: 2,
        name: "index_socks_color",
        sql: "CREATE INDEX idx_socks_color ON socks(color);",
    },
    Migration {
        version: 3,
        name: "bound_socks_quantity",
        sql: r#"
CREATE TABLE socks_bounded (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    color TEXT NOT NULL,
    cotton_percentage INTEGER NOT NULL CHECK (cotton_percentage BETWEEN 0 AND 100),
    quantity INTEGER NOT NULL CHECK (quantity BETWEEN 0 AND 2147483647),
    UNIQUE(color, cotton_percentage)
);
INSERT INTO socks_bounded (id, color, cotton_percentage, quantity)
    SELECT id, color, cotton_percentage, quantity FROM socks;
DROP TABLE socks;
ALTER TABLE socks_bounded RENAME TO socks;
CREATE INDEX idx_socks_color ON socks(color);
"#,
    },
];

/// A row of `schema_migrations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
    pub checksum: String,
    pub applied_at: i64,
}

/// Apply every pending migration from `migrations`.
///
/// Returns the versions applied by this call (empty when up to date).
pub fn apply(conn: &mut Connection, migrations: &[Migration]) -> Result<Vec<u32>> {
    conn.execute(CREATE_MIGRATIONS_TABLE, [])?;

    let mut ordered: Vec<&Migration> = migrations.iter().collect();
    ordered.sort_by_key(|m| m.version);

    let mut newly_applied = Vec::new();
    for migration in ordered {
        let recorded: Option<String> = conn
            .query_row(
                "SELECT checksum FROM schema_migrations WHERE version = ?1",
                [migration.version],
                |row| row.get(0),
            )
            .optional()?;

        let checksum = migration.checksum();
        match recorded {
            Some(existing) if existing == checksum => continue,
            Some(existing) => {
                return Err(Error::Migration(format!(
                    "migration {} ({}) was modified after being applied: recorded checksum {}, found {}",
                    migration.version, migration.name, existing, checksum
                )));
            }
            None => {}
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql).map_err(|e| {
            Error::Migration(format!(
                "migration {} ({}) failed: {}",
                migration.version, migration.name, e
            ))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, checksum, applied_at) VALUES (?1, ?2, ?3, strftime('%s','now'))",
            params![migration.version, migration.name, checksum],
        )?;
        tx.commit()?;

        tracing::info!("Applied migration {} ({})", migration.version, migration.name);
        newly_applied.push(migration.version);
    }

    Ok(newly_applied)
}

/// List recorded migrations in version order
pub fn applied(conn: &Connection) -> Result<Vec<AppliedMigration>> {
    let mut stmt = conn.prepare(
        "SELECT version, name, checksum, applied_at FROM schema_migrations ORDER BY version",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AppliedMigration {
                version: row.get(0)?,
                name: row.get(1)?,
                checksum: row.get(2)?,
                applied_at: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
