//! Import outcome: success count plus ordered row-level failures

use serde::Serialize;

/// A failure scoped to one input row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// 1-based data row number (the header is not counted)
    pub row: usize,
    /// Offending column, when one can be identified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub reason: String,
}

impl RowError {
    pub fn new(row: usize, column: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            row,
            column: column.map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.column {
            Some(column) => write!(f, "row {} [{}]: {}", self.row, column, self.reason),
            None => write!(f, "row {}: {}", self.row, self.reason),
        }
    }
}

/// Result of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Data rows read (header excluded)
    pub rows: usize,
    /// Rows committed to the store
    pub imported: usize,
    /// Rows rejected
    pub failed: usize,
    /// One entry per problem, in row order
    pub errors: Vec<RowError>,
    /// The run stopped early on request; committed rows were kept
    pub cancelled: bool,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }

    pub(crate) fn reject(&mut self, errors: impl IntoIterator<Item = RowError>) {
        self.failed += 1;
        self.errors.extend(errors);
    }
}
