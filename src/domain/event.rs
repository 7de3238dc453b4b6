//! Ledger event: one immutable row of the trade log.

use crate::domain::{note, Decimal, LotId, Sequence, Ticker};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Open,
    Trim,
    Close,
    Stop,
    Split,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Open => "OPEN",
            EventKind::Trim => "TRIM",
            EventKind::Close => "CLOSE",
            EventKind::Stop => "STOP",
            EventKind::Split => "SPLIT",
        };
        f.write_str(s)
    }
}

/// Why an event could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("quantity must be > 0, got {0}")]
    NonPositiveQuantity(Decimal),
    #[error("quantity must be >= 0, got {0}")]
    NegativeQuantity(Decimal),
    #[error("price must be >= 0, got {0}")]
    NegativePrice(Decimal),
    #[error("stop must be >= 0, got {0}")]
    NegativeStop(Decimal),
    #[error("split needs at least one part")]
    EmptySplit,
    #[error("invalid split part {part:?}: {reason}")]
    InvalidPart { part: String, reason: String },
}

/// One tranche of a split: quantity carried into a new lot and its stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPart {
    pub quantity: Decimal,
    pub stop: Decimal,
}

impl SplitPart {
    pub fn new(quantity: Decimal, stop: Decimal) -> Self {
        Self { quantity, stop }
    }

    /// Parse `<qty>@<stop>`, e.g. `5@420`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (qty, stop) = raw
            .split_once('@')
            .ok_or_else(|| format!("expected <qty>@<stop>, got {:?}", raw))?;
        let quantity = Decimal::from_str_canonical(qty)
            .map_err(|e| format!("invalid quantity {:?}: {}", qty, e))?;
        let stop = Decimal::from_str_canonical(stop)
            .map_err(|e| format!("invalid stop {:?}: {}", stop, e))?;
        Ok(Self { quantity, stop })
    }

    fn validate(&self) -> Result<(), EventError> {
        if !self.quantity.is_positive() {
            return Err(EventError::InvalidPart {
                part: self.to_string(),
                reason: "quantity must be > 0".to_string(),
            });
        }
        if self.stop.is_negative() {
            return Err(EventError::InvalidPart {
                part: self.to_string(),
                reason: "stop must be >= 0".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for SplitPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.quantity, self.stop)
    }
}

impl std::str::FromStr for SplitPart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// What an event does. Each variant carries exactly the fields its kind requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum Action {
    Open {
        quantity: Decimal,
        price: Decimal,
        stop: Decimal,
    },
    Trim {
        quantity: Decimal,
        price: Decimal,
    },
    /// Sell the whole remaining quantity of the target lot.
    ///
    /// `quantity` records what the lot held when the row was written; replay
    /// ignores it and sells whatever actually remains.
    Close { quantity: Decimal, price: Decimal },
    Stop { stop: Decimal },
    Split { parts: Vec<SplitPart> },
}

impl Action {
    pub fn kind(&self) -> EventKind {
        match self {
            Action::Open { .. } => EventKind::Open,
            Action::Trim { .. } => EventKind::Trim,
            Action::Close { .. } => EventKind::Close,
            Action::Stop { .. } => EventKind::Stop,
            Action::Split { .. } => EventKind::Split,
        }
    }

    fn validate(&self) -> Result<(), EventError> {
        fn price(p: Decimal) -> Result<(), EventError> {
            if p.is_negative() {
                Err(EventError::NegativePrice(p))
            } else {
                Ok(())
            }
        }
        fn stop(s: Decimal) -> Result<(), EventError> {
            if s.is_negative() {
                Err(EventError::NegativeStop(s))
            } else {
                Ok(())
            }
        }
        fn quantity(q: Decimal) -> Result<(), EventError> {
            if q.is_positive() {
                Ok(())
            } else {
                Err(EventError::NonPositiveQuantity(q))
            }
        }

        match self {
            Action::Open {
                quantity: q,
                price: p,
                stop: s,
            } => {
                quantity(*q)?;
                price(*p)?;
                stop(*s)
            }
            Action::Trim {
                quantity: q,
                price: p,
            } => {
                quantity(*q)?;
                price(*p)
            }
            Action::Close {
                quantity: q,
                price: p,
            } => {
                if q.is_negative() {
                    return Err(EventError::NegativeQuantity(*q));
                }
                price(*p)
            }
            Action::Stop { stop: s } => stop(*s),
            Action::Split { parts } => {
                if parts.is_empty() {
                    return Err(EventError::EmptySplit);
                }
                parts.iter().try_for_each(SplitPart::validate)
            }
        }
    }
}

/// One ledger row, already parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Append-order index; replay order is ascending sequence.
    pub sequence: Sequence,
    /// Informational trade date.
    pub date: NaiveDate,
    pub ticker: Ticker,
    pub action: Action,
    /// Free text as persisted.
    pub note: String,
    /// Lot id decoded from `note`. Always `None` for OPEN.
    pub target: Option<LotId>,
}

impl Event {
    /// Create a validated event, decoding the target lot id from the note.
    pub fn new(
        sequence: Sequence,
        date: NaiveDate,
        ticker: Ticker,
        action: Action,
        note: impl Into<String>,
    ) -> Result<Self, EventError> {
        action.validate()?;
        let note = note.into();
        let target = match &action {
            Action::Open { .. } => None,
            _ => note::decode(&note),
        };
        Ok(Self {
            sequence,
            date,
            ticker,
            action,
            note,
            target,
        })
    }

    pub fn kind(&self) -> EventKind {
        self.action.kind()
    }

    /// Quantity column: bought/sold units for OPEN/TRIM, the recorded (and
    /// ignored) remaining quantity for CLOSE, absent otherwise.
    pub fn quantity(&self) -> Option<Decimal> {
        match &self.action {
            Action::Open { quantity, .. }
            | Action::Trim { quantity, .. }
            | Action::Close { quantity, .. } => Some(*quantity),
            _ => None,
        }
    }

    /// Price column: present for OPEN/TRIM/CLOSE.
    pub fn price(&self) -> Option<Decimal> {
        match &self.action {
            Action::Open { price, .. }
            | Action::Trim { price, .. }
            | Action::Close { price, .. } => Some(*price),
            _ => None,
        }
    }

    /// Stop column: present for OPEN/STOP, and the first part's stop for SPLIT.
    pub fn stop(&self) -> Option<Decimal> {
        match &self.action {
            Action::Open { stop, .. } | Action::Stop { stop } => Some(*stop),
            Action::Split { parts } => parts.first().map(|p| p.stop),
            _ => None,
        }
    }
}
