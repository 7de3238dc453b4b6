use crate::config::ConfigError;
use crate::domain::{EventError, EventKind, Ticker};
use crate::engine::{LedgerError, ReplayError};
use crate::ledger::LedgerStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Ledger storage error: {0}")]
    Store(#[from] LedgerStoreError),
    /// The persisted log itself no longer replays.
    #[error("Ledger does not replay: {0}")]
    Replay(#[from] ReplayError),
    /// The log replays but its positions cannot be summarized.
    #[error("Report failed: {0}")]
    Report(#[source] LedgerError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// A new entry would break replay, so it was not appended.
    #[error("Rejected {kind} for {ticker}: {source}")]
    Rejected {
        kind: EventKind,
        ticker: Ticker,
        #[source]
        source: LedgerError,
    },
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
