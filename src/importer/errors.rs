//! Fatal import errors
//!
//! Anything listed here aborts the whole import. Problems scoped to a single
//! row are collected in the [`ImportReport`](super::ImportReport) instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Input is not valid UTF-8 (line {line})")]
    Encoding { line: u64 },

    #[error("Duplicate header column: {0}")]
    DuplicateColumn(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV: {0}")]
    Csv(String),

    #[error("Storage failure after {imported} rows: {source}")]
    Storage {
        imported: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Import timed out after {secs}s ({imported} rows committed)")]
    TimedOut { secs: u64, imported: usize },
}

impl ImportError {
    /// Classify a reader error as encoding, I/O or structural
    pub(crate) fn from_csv(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Utf8 { pos, .. } => ImportError::Encoding {
                line: pos.map(|p| p.line()).unwrap_or(line),
            },
            csv::ErrorKind::Io(io) => ImportError::Io(io),
            other => ImportError::Csv(format!("{:?}", other)),
        }
    }
}
