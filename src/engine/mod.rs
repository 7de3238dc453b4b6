//! Pure computation engine for ledger replay.
//!
//! No IO happens here: callers hand in parsed events and receive a lot store,
//! the realized total and a report.

pub mod error;
pub mod lot_store;
pub mod matching;
pub mod replay;
pub mod report;

pub use error::{LedgerError, ReplayError};
pub use lot_store::{Lot, LotStatus, LotStore};
pub use matching::MatchPolicy;
pub use replay::{replay, replay_with_policy, ReplayOutcome, Replayer};
pub use report::{summarize, PortfolioReport, TickerSummary};
