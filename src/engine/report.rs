//! Aggregate views derived from a final lot store.

use crate::domain::{Decimal, Ticker};
use serde::Serialize;
use std::collections::BTreeMap;

use super::lot_store::overflow;
use super::{LedgerError, Lot, LotStore};

/// Per-ticker position summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerSummary {
    pub ticker: Ticker,
    pub open_quantity: Decimal,
    /// Quantity-weighted over open lots; `None` when nothing is open.
    pub average_open_price: Option<Decimal>,
    /// Quantity-weighted over open lots; `None` when nothing is open.
    pub average_stop: Option<Decimal>,
    /// Sum of (open price - stop) x remaining quantity over open lots.
    pub risk_to_stop: Decimal,
    pub realized_pnl_total: Decimal,
    /// Every lot of the ticker, open and closed, in id order.
    pub lots: Vec<Lot>,
}

impl TickerSummary {
    pub fn is_flat(&self) -> bool {
        self.open_quantity.is_zero()
    }

    pub fn open_lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter().filter(|lot| lot.is_open())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioReport {
    pub tickers: BTreeMap<Ticker, TickerSummary>,
    pub total_realized_pnl: Decimal,
}

impl PortfolioReport {
    /// Summaries with a non-zero open quantity.
    pub fn open_positions(&self) -> impl Iterator<Item = &TickerSummary> {
        self.tickers.values().filter(|summary| !summary.is_flat())
    }
}

/// Summarize a lot store into per-ticker positions and a grand realized total.
///
/// Fails with [`LedgerError::ArithmeticOverflow`] when an aggregate leaves the
/// decimal range; the store itself is never touched.
pub fn summarize(store: &LotStore) -> Result<PortfolioReport, LedgerError> {
    let mut tickers = BTreeMap::new();
    let mut total_realized_pnl = Decimal::zero();
    for ticker in store.tickers() {
        let summary = summarize_ticker(store, ticker)?;
        total_realized_pnl = total_realized_pnl
            .checked_add(summary.realized_pnl_total)
            .ok_or_else(|| overflow(ticker, "total realized P&L"))?;
        tickers.insert(ticker.clone(), summary);
    }

    Ok(PortfolioReport {
        tickers,
        total_realized_pnl,
    })
}

fn summarize_ticker(store: &LotStore, ticker: &Ticker) -> Result<TickerSummary, LedgerError> {
    let lots: Vec<Lot> = store.lots(ticker).cloned().collect();
    let add = |acc: Decimal, value: Option<Decimal>, what: &'static str| {
        value
            .and_then(|value| acc.checked_add(value))
            .ok_or_else(|| overflow(ticker, what))
    };

    let mut open_quantity = Decimal::zero();
    let mut cost = Decimal::zero();
    let mut stop_weight = Decimal::zero();
    let mut risk_to_stop = Decimal::zero();
    for lot in lots.iter().filter(|lot| lot.is_open()) {
        open_quantity = add(open_quantity, Some(lot.open_quantity), "open quantity")?;
        cost = add(
            cost,
            lot.open_quantity.checked_mul(lot.open_price),
            "average open price",
        )?;
        stop_weight = add(
            stop_weight,
            lot.open_quantity.checked_mul(lot.stop),
            "average stop",
        )?;
        risk_to_stop = add(risk_to_stop, Some(lot.risk_to_stop()?), "risk to stop")?;
    }

    let (average_open_price, average_stop) = if open_quantity.is_zero() {
        (None, None)
    } else {
        let average = |total: Decimal, what: &'static str| {
            total
                .checked_div(open_quantity)
                .ok_or_else(|| overflow(ticker, what))
        };
        (
            Some(average(cost, "average open price")?),
            Some(average(stop_weight, "average stop")?),
        )
    };

    Ok(TickerSummary {
        ticker: ticker.clone(),
        open_quantity,
        average_open_price,
        average_stop,
        risk_to_stop,
        realized_pnl_total: store.realized_pnl(ticker)?,
        lots,
    })
}
