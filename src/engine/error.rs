//! Failures surfaced by the lot store, the match policy and replay.

use crate::domain::{Decimal, EventError, LotId, Sequence, Ticker};
use thiserror::Error;

/// A single event could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Unparsable or out-of-range field, or a broken sequence.
    #[error("malformed event: {0}")]
    MalformedEvent(String),
    /// The referenced lot does not exist or is already closed.
    #[error("unknown lot {ticker} id={lot_id}")]
    UnknownLot { ticker: Ticker, lot_id: LotId },
    /// A trim or split asked for more (or, for splits, other) than the lot holds.
    #[error("insufficient quantity on {ticker} id={lot_id}: requested {requested}, remaining {remaining}")]
    InsufficientQuantity {
        ticker: Ticker,
        lot_id: LotId,
        requested: Decimal,
        remaining: Decimal,
    },
    /// No id in the note and more than one lot open for the ticker.
    #[error("ambiguous lot for {ticker}: {open_lots} lots open, note must carry id=<n>")]
    AmbiguousLot { ticker: Ticker, open_lots: usize },
    /// No id in the note and nothing open for the ticker.
    #[error("no open lot for {ticker}")]
    NoOpenLot { ticker: Ticker },
    /// No id in the note while the explicit-only match policy is active.
    #[error("note for {ticker} must carry id=<n>")]
    MissingLotId { ticker: Ticker },
    /// A quantity, price or P&L figure left the representable decimal range.
    #[error("arithmetic overflow on {ticker} computing {what}")]
    ArithmeticOverflow { ticker: Ticker, what: &'static str },
}

impl From<EventError> for LedgerError {
    fn from(err: EventError) -> Self {
        LedgerError::MalformedEvent(err.to_string())
    }
}

/// Replay halted at `sequence`. No partial state accompanies this error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("replay halted at event {sequence}: {source}")]
pub struct ReplayError {
    pub sequence: Sequence,
    #[source]
    pub source: LedgerError,
}

impl ReplayError {
    pub fn new(sequence: Sequence, source: LedgerError) -> Self {
        Self { sequence, source }
    }

    pub fn kind(&self) -> &LedgerError {
        &self.source
    }
}
