//! Append-only ledger of flight observations
//!
//! This module handles everything that touches the output file:
//! - Header bootstrap that never truncates an existing ledger
//! - Batch appends with fixed-delay retry while the file is unwritable
//! - CSV field quoting and reading the ledger back

mod csv;
mod ledger;

pub use csv::{parse_rows, quote_field, render_row};
pub use ledger::{RecordStore, LEDGER_COLUMNS};

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Gave up writing {path} after {attempts} attempts: {last}")]
    WriteExhausted {
        path: String,
        attempts: u32,
        last: std::io::Error,
    },

    #[error("Ledger {0} has no header row")]
    MissingHeader(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A ledger read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRows {
    /// Column names, trimmed
    pub header: Vec<String>,

    /// Data rows as display text, in file order
    pub rows: Vec<Vec<String>>,
}

impl LedgerRows {
    /// Values of one column, by position
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index).map(String::as_str))
    }
}
