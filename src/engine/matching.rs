//! Policy for resolving a sell/adjust event to the lot it acts on.

use crate::domain::{LotId, Ticker};
use serde::{Deserialize, Serialize};

use super::{LedgerError, LotStore};

/// How to pick the target lot when the note carries no `id=<n>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// Use the only open lot of the ticker; zero or several open lots is an error.
    #[default]
    #[serde(rename = "single-open")]
    SingleOpenFallback,
    /// Every event must name its lot.
    #[serde(rename = "explicit-only")]
    ExplicitOnly,
}

impl MatchPolicy {
    /// Resolve the lot an event targets.
    ///
    /// An explicit id is returned as is, even if that lot is closed or unknown;
    /// the lot store reports that when the event is applied.
    pub fn resolve(
        &self,
        store: &LotStore,
        ticker: &Ticker,
        explicit: Option<LotId>,
    ) -> Result<LotId, LedgerError> {
        if let Some(lot_id) = explicit {
            return Ok(lot_id);
        }

        match self {
            MatchPolicy::ExplicitOnly => Err(LedgerError::MissingLotId {
                ticker: ticker.clone(),
            }),
            MatchPolicy::SingleOpenFallback => {
                let open = store.get_open_lots(ticker);
                match open.as_slice() {
                    [] => Err(LedgerError::NoOpenLot {
                        ticker: ticker.clone(),
                    }),
                    [only] => Ok(only.lot_id),
                    many => Err(LedgerError::AmbiguousLot {
                        ticker: ticker.clone(),
                        open_lots: many.len(),
                    }),
                }
            }
        }
    }
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single-open" => Ok(MatchPolicy::SingleOpenFallback),
            "explicit-only" => Ok(MatchPolicy::ExplicitOnly),
            other => Err(format!(
                "must be single-open or explicit-only, got {}",
                other
            )),
        }
    }
}
