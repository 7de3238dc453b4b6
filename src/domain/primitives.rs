//! Domain primitives: Ticker, LotId, Sequence.

use serde::{Deserialize, Serialize};

/// Ticker symbol, always trimmed and uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Create a Ticker, normalizing case and surrounding whitespace.
    ///
    /// Returns `None` for an empty symbol.
    pub fn new(symbol: &str) -> Option<Self> {
        let normalized = symbol.trim().to_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Ticker(normalized))
        }
    }

    /// Get the ticker as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lot identifier, unique within one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LotId(pub u64);

impl LotId {
    pub fn new(id: u64) -> Self {
        LotId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The id issued after this one.
    pub fn next(&self) -> Self {
        LotId(self.0 + 1)
    }
}

impl std::fmt::Display for LotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-order index of a ledger event. The only source of ordering truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sequence(pub u64);

impl Sequence {
    pub fn new(seq: u64) -> Self {
        Sequence(seq)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Saturates at `u64::MAX`; replay rejects the repeated value.
    pub fn next(&self) -> Self {
        Sequence(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
