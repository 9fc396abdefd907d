//! # Sockshop - Sock warehouse inventory service
//!
//! Tracks the stock of socks per `(color, cotton percentage)` position.
//!
//! Sockshop provides:
//! - SQLite-backed storage with versioned, checksummed migrations
//! - Inventory operations (income, outcome, filtered stock, update)
//! - Streaming CSV bulk import with per-row diagnostics
//! - An axum HTTP API that publishes its own OpenAPI document

pub mod sock;
pub mod storage;
pub mod importer;
pub mod inventory;
pub mod server;
pub mod output;
pub mod config;
pub mod ui;


// Re-exports for convenient access
pub use sock::{Sock, SockMovement, SockRequest, StockFilter};
pub use storage::SqliteStore;
pub use importer::{ImportError, ImportOptions, ImportReport, RowError};
pub use inventory::Inventory;

/// Result type alias for Sockshop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Sockshop operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("Not enough socks in stock: requested {requested}, available {available}")]
    NotEnoughQuantity { requested: i64, available: i64 },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Background task failed: {0}")]
    Task(String),
}
