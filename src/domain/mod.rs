//! Domain types for the trade ledger.
//!
//! This module provides:
//! - Exact numeric handling via Decimal wrapper
//! - Domain primitives: Ticker, LotId, Sequence
//! - The Event model and the note codec that carries lot ids in free text
//! - Sequence ordering helpers for deterministic replay

pub mod decimal;
pub mod event;
pub mod note;
pub mod ordering;
pub mod primitives;

pub use decimal::Decimal;
pub use event::{Action, Event, EventError, EventKind, SplitPart};
pub use note::NoteVerb;
pub use ordering::{next_sequence, sort_events_by_sequence};
pub use primitives::{LotId, Sequence, Ticker};
