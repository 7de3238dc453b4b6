//! Persisted row layout: `id,date,ticker,qty,price,stop,note`.
//!
//! The kind of an event is not stored. It is recovered from the sign of `qty`
//! and the note verb:
//! - `qty > 0`: OPEN
//! - `qty < 0`: CLOSE when the note starts with `close`, otherwise TRIM
//! - `qty = 0`: CLOSE / SPLIT by note verb, otherwise STOP
//!
//! Columns a kind does not use are written as `0`.

use crate::domain::{note, Action, Decimal, Event, NoteVerb, Sequence, Ticker};
use crate::engine::LedgerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const HEADER: [&str; 7] = ["id", "date", "ticker", "qty", "price", "stop", "note"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One CSV row, all columns as text.
///
/// Fields stay strings so unparsable values surface as malformed events
/// instead of CSV errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub id: String,
    pub date: String,
    pub ticker: String,
    pub qty: String,
    pub price: String,
    pub stop: String,
    #[serde(default)]
    pub note: String,
}

fn malformed(field: &str, raw: &str, err: impl std::fmt::Display) -> LedgerError {
    LedgerError::MalformedEvent(format!("invalid {} {:?}: {}", field, raw, err))
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str_canonical(raw).map_err(|e| malformed(field, raw, e))
}

impl LedgerRow {
    /// Decode a row into a validated event.
    pub fn to_event(&self) -> Result<Event, LedgerError> {
        let sequence = self
            .id
            .trim()
            .parse::<u64>()
            .map(Sequence::new)
            .map_err(|e| malformed("id", &self.id, e))?;
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT)
            .map_err(|e| malformed("date", &self.date, e))?;
        let ticker = Ticker::new(&self.ticker)
            .ok_or_else(|| LedgerError::MalformedEvent("empty ticker".to_string()))?;
        let qty = parse_decimal("qty", &self.qty)?;
        let price = parse_decimal("price", &self.price)?;
        let stop = parse_decimal("stop", &self.stop)?;

        let verb = note::decode_verb(&self.note);
        let action = if qty.is_positive() {
            Action::Open {
                quantity: qty,
                price,
                stop,
            }
        } else if verb == Some(NoteVerb::Close) {
            Action::Close {
                quantity: qty.abs(),
                price,
            }
        } else if qty.is_negative() {
            Action::Trim {
                quantity: qty.abs(),
                price,
            }
        } else if verb == Some(NoteVerb::Split) {
            let parts = note::decode_parts(&self.note)
                .map_err(|e| malformed("split parts", &self.note, e))?
                .ok_or_else(|| {
                    LedgerError::MalformedEvent("split note has no parts= token".to_string())
                })?;
            Action::Split { parts }
        } else {
            Action::Stop { stop }
        };

        Ok(Event::new(sequence, date, ticker, action, self.note.clone())?)
    }

    /// Encode an event in the persisted layout.
    pub fn from_event(event: &Event) -> Self {
        let zero = Decimal::zero();
        let (qty, price, stop) = match &event.action {
            Action::Open {
                quantity,
                price,
                stop,
            } => (*quantity, *price, *stop),
            Action::Trim { quantity, price } | Action::Close { quantity, price } => {
                (-*quantity, *price, zero)
            }
            Action::Stop { stop } => (zero, zero, *stop),
            Action::Split { parts } => (zero, zero, parts.first().map(|p| p.stop).unwrap_or(zero)),
        };

        Self {
            id: event.sequence.to_string(),
            date: event.date.format(DATE_FORMAT).to_string(),
            ticker: event.ticker.to_string(),
            qty: qty.to_canonical_string(),
            price: price.to_canonical_string(),
            stop: stop.to_canonical_string(),
            note: event.note.clone(),
        }
    }
}
