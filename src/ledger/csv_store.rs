//! CSV-file ledger.

use super::{EventSink, EventSource, LedgerRow, LedgerStoreError, HEADER};
use crate::domain::Event;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Append-only ledger stored as a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> LedgerStoreError {
        LedgerStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Create the parent directory and a header-only file if missing.
    pub fn ensure_exists(&self) -> Result<(), LedgerStoreError> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(HEADER)?;
        writer.flush().map_err(|e| self.io_error(e))?;

        info!(path = %self.path.display(), "Created ledger file");
        Ok(())
    }

    /// Decode every data row. Line numbers in errors count the header as line 1.
    pub fn parse_csv(bytes: &[u8]) -> Result<Vec<Event>, LedgerStoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);
        let headers = reader.headers()?.clone();

        let mut events = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let row: LedgerRow = record.deserialize(Some(&headers))?;
            let event = row
                .to_event()
                .map_err(|source| LedgerStoreError::Row { line, source })?;
            events.push(event);
        }
        Ok(events)
    }
}

impl EventSource for CsvLedger {
    fn load_events(&self) -> Result<Vec<Event>, LedgerStoreError> {
        self.ensure_exists()?;
        let bytes = fs::read(&self.path).map_err(|e| self.io_error(e))?;
        Self::parse_csv(&bytes)
    }
}

impl EventSink for CsvLedger {
    fn append_event(&mut self, event: &Event) -> Result<(), LedgerStoreError> {
        self.ensure_exists()?;
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(LedgerRow::from_event(event))?;
        writer.flush().map_err(|e| self.io_error(e))?;
        Ok(())
    }
}
