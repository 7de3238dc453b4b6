//! Event storage behind the replay engine.
//!
//! The engine never touches storage; callers load events through an
//! [`EventSource`] and append through an [`EventSink`].

use crate::domain::Event;
use crate::engine::LedgerError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod csv_store;
pub mod memory;
pub mod row;

pub use csv_store::CsvLedger;
pub use memory::MemoryLedger;
pub use row::{LedgerRow, HEADER};

/// Source of the full ordered event log.
pub trait EventSource: fmt::Debug {
    /// Load every persisted event.
    ///
    /// # Returns
    /// Events in storage order; replay sorts by sequence itself.
    fn load_events(&self) -> Result<Vec<Event>, LedgerStoreError>;
}

/// Append-only destination for new events.
pub trait EventSink: fmt::Debug {
    fn append_event(&mut self, event: &Event) -> Result<(), LedgerStoreError>;
}

#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("ledger line {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: LedgerError,
    },
}
