//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;
use rusqlite::{Connection, params, OptionalExtension};
use serde::Serialize;
use crate::{Result, Error};
use crate::sock::{MAX_QUANTITY, Sock, stock_limit_exceeded};
use super::migrations::{self, AppliedMigration};

const SOCK_COLUMNS: &str = "id, color, cotton_percentage, quantity";

/// SQLite-backed storage for stock positions
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist) and migrate it
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mut store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an already migrated database without touching its schema
    pub fn connect(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Apply pending schema migrations, returning the versions applied
    pub fn migrate(&mut self) -> Result<Vec<u32>> {
        migrations::apply(&mut self.conn, migrations::MIGRATIONS)
    }

    /// Migrations recorded in this database
    pub fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
        migrations::applied(&self.conn)
    }

    // ========== Sock Operations ==========

    /// Get a position by id
    pub fn find_sock(&self, id: i64) -> Result<Option<Sock>> {
        self.conn
            .query_row(
                &format!("SELECT {SOCK_COLUMNS} FROM socks WHERE id = ?1"),
                [id],
                row_to_sock,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get the position for a `(color, cotton)` pair
    pub fn find_by_color_and_cotton(&self, color: &str, cotton_percentage: i64) -> Result<Option<Sock>> {
        self.conn
            .query_row(
                &format!("SELECT {SOCK_COLUMNS} FROM socks WHERE color = ?1 AND cotton_percentage = ?2"),
                params![color, cotton_percentage],
                row_to_sock,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All positions ordered by color, then cotton percentage
    pub fn list_socks(&self) -> Result<Vec<Sock>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SOCK_COLUMNS} FROM socks ORDER BY color, cotton_percentage"
        ))?;

        let socks = stmt
            .query_map([], row_to_sock)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(socks)
    }

    /// Add `quantity` to a position, creating it when absent.
    ///
    /// Returns the position after the change. A movement that would take the
    /// position past [`MAX_QUANTITY`] is refused with a validation error and
    /// leaves the stock untouched.
    pub fn add_quantity(&self, color: &str, cotton_percentage: i64, quantity: i64) -> Result<Sock> {
        self.try_add_quantity(color, cotton_percentage, quantity)?
            .ok_or_else(|| Error::Validation(vec![stock_limit_exceeded(color, cotton_percentage)]))
    }

    /// Like [`add_quantity`](Self::add_quantity) but keeps the driver error so
    /// callers can tell constraint violations from infrastructure failures.
    ///
    /// `Ok(None)` means the merged quantity would exceed [`MAX_QUANTITY`].
    pub fn try_add_quantity(
        &self,
        color: &str,
        cotton_percentage: i64,
        quantity: i64,
    ) -> rusqlite::Result<Option<Sock>> {
        self.conn
            .query_row(
                &format!(
                    r#"
                    INSERT INTO socks (color, cotton_percentage, quantity)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(color, cotton_percentage) DO UPDATE
                        SET quantity = quantity + excluded.quantity
                        WHERE socks.quantity + excluded.quantity <= ?4
                    RETURNING {SOCK_COLUMNS}
                    "#
                ),
                params![color, cotton_percentage, quantity, MAX_QUANTITY],
                row_to_sock,
            )
            .optional()
    }

    /// Remove `quantity` from an existing position.
    ///
    /// A single conditional statement, so concurrent writers wait on the busy
    /// timeout instead of failing a lock upgrade.
    pub fn remove_quantity(&self, color: &str, cotton_percentage: i64, quantity: i64) -> Result<Sock> {
        let updated = self
            .conn
            .query_row(
                &format!(
                    r#"
                    UPDATE socks SET quantity = quantity - ?1
                    WHERE color = ?2 AND cotton_percentage = ?3 AND quantity >= ?1
                    RETURNING {SOCK_COLUMNS}
                    "#
                ),
                params![quantity, color, cotton_percentage],
                row_to_sock,
            )
            .optional()?;

        if let Some(sock) = updated {
            return Ok(sock);
        }

        match self.find_by_color_and_cotton(color, cotton_percentage)? {
            None => Err(Error::NotFound("Socks not found".to_string())),
            Some(current) => Err(Error::NotEnoughQuantity {
                requested: quantity,
                available: current.quantity,
            }),
        }
    }

    /// Overwrite every field of a position
    pub fn update_sock(&self, sock: &Sock) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE socks SET color = ?1, cotton_percentage = ?2, quantity = ?3 WHERE id = ?4",
            params![sock.color, sock.cotton_percentage, sock.quantity, sock.id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Sock not found with id: {}", sock.id)));
        }
        Ok(())
    }

    /// Sum of quantities of one color within an inclusive cotton range
    pub fn total_quantity(&self, color: &str, min_cotton: i64, max_cotton: i64) -> Result<i64> {
        let total: i64 = self.conn.query_row(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM socks
            WHERE color = ?1 AND cotton_percentage >= ?2 AND cotton_percentage <= ?3
            "#,
            params![color, min_cotton, max_cotton],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Count all positions
    pub fn count_socks(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM socks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let (pairs, colors): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(quantity), 0), COUNT(DISTINCT color) FROM socks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let schema_version: Option<u32> = self.conn.query_row(
            "SELECT MAX(version) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;

        Ok(DbStats {
            positions: self.count_socks()?,
            pairs,
            colors: colors as usize,
            schema_version: schema_version.unwrap_or(0),
        })
    }
}

/// Helper to convert a row to a Sock
fn row_to_sock(row: &rusqlite::Row) -> rusqlite::Result<Sock> {
    Ok(Sock {
        id: row.get(0)?,
        color: row.get(1)?,
        cotton_percentage: row.get(2)?,
        quantity: row.get(3)?,
    })
}

/// Whether a driver error was caused by the written data rather than the database
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Whether a driver error is a `UNIQUE(color, cotton_percentage)` clash
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub positions: usize,
    pub pairs: i64,
    pub colors: usize,
    pub schema_version: u32,
}
