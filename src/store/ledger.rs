//! CSV ledger file

use crate::config::Config;
use crate::record::FlightObservation;
use crate::store::csv::{parse_rows, render_row};
use crate::store::{LedgerRows, StoreError, StoreResult};
use crate::timing::Waiter;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Ledger columns, in file order
pub const LEDGER_COLUMNS: [&str; 7] = [
    "Date Collected",
    "Airline",
    "Departure Time",
    "Arrival Time",
    "Number of Stops",
    "Price",
    "Cabin Class",
];

/// Append-only CSV ledger of flight observations
///
/// The file may be held open by another process (a spreadsheet, a sync
/// client). A failed append is retried after a fixed delay until it lands, or
/// until `max_attempts` when a cap is set.
pub struct RecordStore<W> {
    path: PathBuf,
    timestamp_format: String,
    retry_delay: Duration,
    max_attempts: Option<u32>,
    waiter: W,
}

impl<W: Waiter> RecordStore<W> {
    /// Creates a store with unbounded write retries
    pub fn new(
        path: impl Into<PathBuf>,
        timestamp_format: impl Into<String>,
        retry_delay: Duration,
        waiter: W,
    ) -> Self {
        Self {
            path: path.into(),
            timestamp_format: timestamp_format.into(),
            retry_delay,
            max_attempts: None,
            waiter,
        }
    }

    /// Creates the store described by the output and timing sections
    pub fn from_config(config: &Config, waiter: W) -> Self {
        Self::new(
            &config.output.csv_path,
            &config.output.timestamp_format,
            config.timing.write_retry_delay(),
            waiter,
        )
        .with_max_attempts(config.timing.max_write_attempts)
    }

    /// Caps write attempts per batch; `None` retries forever
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    /// Creates the ledger with its header row unless it already exists
    ///
    /// Returns true if this call created the file. An existing file is never
    /// opened for writing here, so it cannot be truncated.
    pub fn ensure_initialized(&self) -> StoreResult<bool> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => {
                self.write_header(file)?;
                tracing::info!("Created ledger {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("Ledger {} already exists", self.path.display());
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the header into a freshly created ledger
    ///
    /// On failure the file is removed again; a headerless ledger would pass the
    /// existence check on every later run.
    fn write_header<F: Write>(&self, mut file: F) -> StoreResult<()> {
        let written = file
            .write_all(header_line().as_bytes())
            .and_then(|()| file.flush());
        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = std::fs::remove_file(&self.path) {
                tracing::warn!(
                    "Failed to remove incomplete ledger {}: {}",
                    self.path.display(),
                    cleanup
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Appends one row per record, in batch order
    ///
    /// The whole batch is written with a single `write_all`. A write that fails
    /// part way is retried with the full batch, which can duplicate the rows
    /// that did land.
    pub async fn append(&self, batch: &[FlightObservation]) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let payload: String = batch
            .iter()
            .map(|record| render_row(&record.to_fields(&self.timestamp_format)))
            .collect();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.write_payload(&payload) {
                Ok(()) => {
                    tracing::debug!(
                        "Appended {} rows to {} (attempt {})",
                        batch.len(),
                        self.path.display(),
                        attempt
                    );
                    return Ok(());
                }
                Err(e) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        return Err(StoreError::WriteExhausted {
                            path: self.path.display().to_string(),
                            attempts: attempt,
                            last: e,
                        });
                    }
                    tracing::warn!(
                        "Ledger {} not writable (attempt {}): {}; retrying in {:?}",
                        self.path.display(),
                        attempt,
                        e,
                        self.retry_delay
                    );
                    self.waiter.wait(self.retry_delay).await;
                }
            }
        }
    }

    fn write_payload(&self, payload: &str) -> std::io::Result<()> {
        // No create: a missing ledger is unwritable until bootstrapped
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(payload.as_bytes())?;
        file.flush()
    }

    /// Reads the ledger back as display text
    pub fn read_rows(&self) -> StoreResult<LedgerRows> {
        let text = std::fs::read_to_string(&self.path)?;
        let mut rows = parse_rows(&text).into_iter();
        let header = rows
            .next()
            .ok_or_else(|| StoreError::MissingHeader(self.path.display().to_string()))?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(LedgerRows {
            header,
            rows: rows.collect(),
        })
    }
}

/// The header as written to a new ledger
fn header_line() -> String {
    let mut line = LEDGER_COLUMNS.join(", ");
    line.push('\n');
    line
}
