//! Record sinks: where validated rows are written

use super::schema::ParsedRow;
use crate::sock::{SockMovement, stock_limit_exceeded};
use crate::storage::{SqliteStore, is_constraint_violation};

/// Failure while writing a single row
#[derive(Debug)]
pub enum SinkError {
    /// Caused by the row content; the import continues
    Row { column: Option<String>, reason: String },
    /// Caused by the store itself; the import stops
    Fatal(rusqlite::Error),
}

/// Destination of imported rows. Each successful `write` is durable on return.
pub trait RecordSink {
    fn write(&mut self, row: &ParsedRow) -> Result<(), SinkError>;
}

/// Adds every imported row to the stock of its `(color, cotton)` position
pub struct SockSink<'a> {
    store: &'a SqliteStore,
}

impl<'a> SockSink<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    fn movement(row: &ParsedRow) -> Result<SockMovement, SinkError> {
        let missing = |column: &str| SinkError::Row {
            column: Some(column.to_string()),
            reason: "missing required value".to_string(),
        };
        Ok(SockMovement {
            color: row.text("color").ok_or_else(|| missing("color"))?.to_string(),
            cotton_percentage: row
                .integer("cottonPercentage")
                .ok_or_else(|| missing("cottonPercentage"))?,
            quantity: row.integer("quantity").ok_or_else(|| missing("quantity"))?,
        })
    }
}

impl RecordSink for SockSink<'_> {
    fn write(&mut self, row: &ParsedRow) -> Result<(), SinkError> {
        let movement = Self::movement(row)?;
        match self
            .store
            .try_add_quantity(&movement.color, movement.cotton_percentage, movement.quantity)
        {
            Ok(Some(sock)) => {
                tracing::debug!(
                    "row {}: {} x {} ({}% cotton) -> {} in stock",
                    row.row, movement.quantity, movement.color, movement.cotton_percentage, sock.quantity
                );
                Ok(())
            }
            Ok(None) => Err(SinkError::Row {
                column: Some("quantity".to_string()),
                reason: stock_limit_exceeded(&movement.color, movement.cotton_percentage),
            }),
            Err(e) if is_constraint_violation(&e) => Err(SinkError::Row {
                column: None,
                reason: format!("constraint violation: {}", e),
            }),
            Err(e) => Err(SinkError::Fatal(e)),
        }
    }
}
