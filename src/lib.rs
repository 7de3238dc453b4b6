pub mod book;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod presentation;

pub use book::{Recorded, TradeBook};
pub use config::Config;
pub use domain::{Action, Decimal, Event, EventKind, LotId, Sequence, SplitPart, Ticker};
pub use engine::{
    replay, replay_with_policy, summarize, LedgerError, Lot, LotStatus, LotStore, MatchPolicy,
    PortfolioReport, ReplayError, ReplayOutcome,
};
pub use error::AppError;
pub use ledger::{CsvLedger, EventSink, EventSource, MemoryLedger};
