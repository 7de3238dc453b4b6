use crate::domain::{Decimal, LotId, SplitPart, Ticker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LotStatus {
    Open,
    Closed,
}

/// A purchase tranche with its own id, entry price and stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub lot_id: LotId,
    pub ticker: Ticker,
    pub open_price: Decimal,
    pub stop: Decimal,
    /// Remaining quantity. Zero once the lot is closed.
    pub open_quantity: Decimal,
    pub status: LotStatus,
    /// Cumulative P&L booked by trims and closes against this lot.
    pub realized_pnl: Decimal,
    /// Source lot when this lot was produced by a split.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_from: Option<LotId>,
}

impl Lot {
    pub fn is_open(&self) -> bool {
        self.status == LotStatus::Open
    }

    /// Loss taken if the remaining quantity is stopped out.
    pub fn risk_to_stop(&self) -> Result<Decimal, LedgerError> {
        self.open_price
            .checked_sub(self.stop)
            .and_then(|per_unit| per_unit.checked_mul(self.open_quantity))
            .ok_or_else(|| overflow(&self.ticker, "risk to stop"))
    }
}

pub(crate) fn overflow(ticker: &Ticker, what: &'static str) -> LedgerError {
    LedgerError::ArithmeticOverflow {
        ticker: ticker.clone(),
        what,
    }
}

/// All lots ever opened, keyed by ticker then lot id.
///
/// Lots are never removed, so the highest key per ticker is the last id issued.
/// Every mutating call validates before it writes: an `Err` leaves the store untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotStore {
    lots: BTreeMap<Ticker, BTreeMap<LotId, Lot>>,
}

impl LotStore {
    pub fn new() -> Self {
        Self {
            lots: BTreeMap::new(),
        }
    }

    /// Open a new lot with the next id for `ticker`.
    pub fn create_lot(
        &mut self,
        ticker: &Ticker,
        price: Decimal,
        stop: Decimal,
        quantity: Decimal,
    ) -> LotId {
        self.insert_lot(ticker, price, stop, quantity, None)
    }

    fn insert_lot(
        &mut self,
        ticker: &Ticker,
        price: Decimal,
        stop: Decimal,
        quantity: Decimal,
        split_from: Option<LotId>,
    ) -> LotId {
        let lots = self.lots.entry(ticker.clone()).or_default();
        let lot_id = lots
            .keys()
            .next_back()
            .map(|last| last.next())
            .unwrap_or(LotId::new(1));

        lots.insert(
            lot_id,
            Lot {
                lot_id,
                ticker: ticker.clone(),
                open_price: price,
                stop,
                open_quantity: quantity,
                status: LotStatus::Open,
                realized_pnl: Decimal::zero(),
                split_from,
            },
        );
        lot_id
    }

    /// Open lots for `ticker`, oldest first.
    pub fn get_open_lots(&self, ticker: &Ticker) -> Vec<&Lot> {
        self.lots(ticker).filter(|lot| lot.is_open()).collect()
    }

    /// Every lot for `ticker`, open or closed, in id order.
    pub fn lots<'a>(&'a self, ticker: &Ticker) -> impl Iterator<Item = &'a Lot> + 'a {
        self.lots.get(ticker).into_iter().flat_map(|lots| lots.values())
    }

    pub fn get(&self, ticker: &Ticker, lot_id: LotId) -> Option<&Lot> {
        self.lots.get(ticker).and_then(|lots| lots.get(&lot_id))
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.lots.keys()
    }

    /// All lots, ordered by ticker then id.
    pub fn iter(&self) -> impl Iterator<Item = &Lot> {
        self.lots.values().flat_map(|lots| lots.values())
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn open_quantity(&self, ticker: &Ticker) -> Result<Decimal, LedgerError> {
        Decimal::checked_sum(self.lots(ticker).map(|lot| lot.open_quantity))
            .ok_or_else(|| overflow(ticker, "open quantity"))
    }

    pub fn realized_pnl(&self, ticker: &Ticker) -> Result<Decimal, LedgerError> {
        Decimal::checked_sum(self.lots(ticker).map(|lot| lot.realized_pnl))
            .ok_or_else(|| overflow(ticker, "realized P&L"))
    }

    fn open_lot(&self, ticker: &Ticker, lot_id: LotId) -> Result<&Lot, LedgerError> {
        self.get(ticker, lot_id)
            .filter(|lot| lot.is_open())
            .ok_or_else(|| LedgerError::UnknownLot {
                ticker: ticker.clone(),
                lot_id,
            })
    }

    fn open_lot_mut(&mut self, ticker: &Ticker, lot_id: LotId) -> Result<&mut Lot, LedgerError> {
        self.lots
            .get_mut(ticker)
            .and_then(|lots| lots.get_mut(&lot_id))
            .filter(|lot| lot.is_open())
            .ok_or_else(|| LedgerError::UnknownLot {
                ticker: ticker.clone(),
                lot_id,
            })
    }

    /// Realized P&L a trim would book, without touching the store.
    ///
    /// Fails exactly when [`LotStore::apply_trim`] would.
    pub fn trim_pnl(
        &self,
        ticker: &Ticker,
        lot_id: LotId,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let lot = self.open_lot(ticker, lot_id)?;
        if quantity > lot.open_quantity {
            return Err(LedgerError::InsufficientQuantity {
                ticker: ticker.clone(),
                lot_id,
                requested: quantity,
                remaining: lot.open_quantity,
            });
        }

        let delta = price
            .checked_sub(lot.open_price)
            .and_then(|per_unit| per_unit.checked_mul(quantity))
            .ok_or_else(|| overflow(ticker, "trim P&L"))?;
        lot.realized_pnl
            .checked_add(delta)
            .ok_or_else(|| overflow(ticker, "lot realized P&L"))?;
        Ok(delta)
    }

    /// Sell `quantity` from a lot at `price`. Returns the realized P&L delta.
    pub fn apply_trim(
        &mut self,
        ticker: &Ticker,
        lot_id: LotId,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let delta = self.trim_pnl(ticker, lot_id, quantity, price)?;

        let lot = self.open_lot_mut(ticker, lot_id)?;
        // quantity <= open_quantity and realized + delta were both checked above
        lot.open_quantity -= quantity;
        lot.realized_pnl += delta;
        if lot.open_quantity.is_zero() {
            lot.status = LotStatus::Closed;
        }
        Ok(delta)
    }

    pub fn apply_stop(
        &mut self,
        ticker: &Ticker,
        lot_id: LotId,
        new_stop: Decimal,
    ) -> Result<(), LedgerError> {
        let lot = self.open_lot_mut(ticker, lot_id)?;
        lot.stop = new_stop;
        Ok(())
    }

    /// Close a lot and reopen its remaining quantity as one lot per part.
    ///
    /// Part quantities must add up to exactly the remaining quantity. New lots keep
    /// the source's open price and receive fresh ids in part order.
    pub fn apply_split(
        &mut self,
        ticker: &Ticker,
        lot_id: LotId,
        parts: &[SplitPart],
    ) -> Result<Vec<LotId>, LedgerError> {
        let source = self.open_lot(ticker, lot_id)?;
        let requested = Decimal::checked_sum(parts.iter().map(|p| p.quantity))
            .ok_or_else(|| overflow(ticker, "split quantity"))?;
        if parts.is_empty() || requested != source.open_quantity {
            return Err(LedgerError::InsufficientQuantity {
                ticker: ticker.clone(),
                lot_id,
                requested,
                remaining: source.open_quantity,
            });
        }
        let open_price = source.open_price;

        let source = self.open_lot_mut(ticker, lot_id)?;
        source.open_quantity = Decimal::zero();
        source.status = LotStatus::Closed;

        Ok(parts
            .iter()
            .map(|part| self.insert_lot(ticker, open_price, part.stop, part.quantity, Some(lot_id)))
            .collect())
    }

    /// Hex SHA-256 over every lot's canonical fields.
    ///
    /// Two stores with equal contents always share a fingerprint.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u64).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        for lot in self.iter() {
            hash_var(&mut hasher, lot.ticker.as_str());
            hasher.update(lot.lot_id.as_u64().to_le_bytes());
            hash_var(&mut hasher, &lot.open_price.to_canonical_string());
            hash_var(&mut hasher, &lot.stop.to_canonical_string());
            hash_var(&mut hasher, &lot.open_quantity.to_canonical_string());
            hasher.update(if lot.is_open() { b"O" } else { b"C" });
            hash_var(&mut hasher, &lot.realized_pnl.to_canonical_string());
            match lot.split_from {
                Some(parent) => {
                    hasher.update(b"S");
                    hasher.update(parent.as_u64().to_le_bytes());
                }
                None => hasher.update(b"-"),
            }
        }
        hex::encode(hasher.finalize())
    }
}
