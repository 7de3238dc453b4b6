//! Command-level operations on a ledger: build, validate and append events.
//!
//! Every write replays the stored log, applies the candidate on top and only
//! appends when that succeeds, so the log never gains a row it cannot replay.

use crate::domain::{
    next_sequence, note, Action, Decimal, Event, EventKind, LotId, NoteVerb, Sequence, SplitPart,
    Ticker,
};
use crate::engine::{summarize, MatchPolicy, PortfolioReport, ReplayOutcome, Replayer};
use crate::error::AppError;
use crate::ledger::{EventSink, EventSource};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// The event as appended.
    pub event: Event,
    /// Lots the event touched: the new lot for OPEN, the target for
    /// TRIM/CLOSE/STOP, the lots created by SPLIT.
    pub lot_ids: Vec<LotId>,
    /// State after the event.
    pub outcome: ReplayOutcome,
}

#[derive(Debug)]
pub struct TradeBook<L> {
    ledger: L,
    policy: MatchPolicy,
}

impl<L> TradeBook<L>
where
    L: EventSource + EventSink,
{
    pub fn new(ledger: L, policy: MatchPolicy) -> Self {
        Self { ledger, policy }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Replay the stored log.
    pub fn replay(&self) -> Result<ReplayOutcome, AppError> {
        Ok(self.load()?.1.into_outcome())
    }

    /// Replay the stored log and summarize it.
    pub fn report(&self) -> Result<PortfolioReport, AppError> {
        summarize(&self.replay()?.store).map_err(AppError::Report)
    }

    /// Record a purchase as a new lot.
    pub fn open(
        &mut self,
        ticker: &str,
        quantity: Decimal,
        price: Decimal,
        stop: Decimal,
        free_text: &str,
        date: NaiveDate,
    ) -> Result<Recorded, AppError> {
        let ticker = parse_ticker(ticker)?;
        let (sequence, mut replayer) = self.load()?;
        let action = Action::Open {
            quantity,
            price,
            stop,
        };
        let event = build_event(sequence, date, &ticker, action, free_text.to_string())?;
        self.commit(&mut replayer, &event)?;

        let lot_ids = replayer
            .store()
            .lots(&ticker)
            .last()
            .map(|lot| vec![lot.lot_id])
            .unwrap_or_default();
        Ok(finish(replayer, event, lot_ids))
    }

    /// Sell part of a lot.
    pub fn trim(
        &mut self,
        ticker: &str,
        quantity: Decimal,
        price: Decimal,
        lot: Option<LotId>,
        free_text: &str,
        date: NaiveDate,
    ) -> Result<Recorded, AppError> {
        let ticker = parse_ticker(ticker)?;
        let (sequence, mut replayer) = self.load()?;
        let lot_id = self.resolve(&replayer, EventKind::Trim, &ticker, lot)?;
        let note = note::encode(NoteVerb::Trim, Some(lot_id), free_text);
        let event = build_event(sequence, date, &ticker, Action::Trim { quantity, price }, note)?;
        self.commit(&mut replayer, &event)?;
        Ok(finish(replayer, event, vec![lot_id]))
    }

    /// Sell everything a lot still holds.
    pub fn close(
        &mut self,
        ticker: &str,
        price: Decimal,
        lot: Option<LotId>,
        free_text: &str,
        date: NaiveDate,
    ) -> Result<Recorded, AppError> {
        let ticker = parse_ticker(ticker)?;
        let (sequence, mut replayer) = self.load()?;
        let lot_id = self.resolve(&replayer, EventKind::Close, &ticker, lot)?;
        // Recorded for readers of the raw file; replay recomputes it.
        let quantity = replayer
            .store()
            .get(&ticker, lot_id)
            .filter(|lot| lot.is_open())
            .map(|lot| lot.open_quantity)
            .unwrap_or_default();
        let note = note::encode(NoteVerb::Close, Some(lot_id), free_text);
        let event = build_event(sequence, date, &ticker, Action::Close { quantity, price }, note)?;
        self.commit(&mut replayer, &event)?;
        Ok(finish(replayer, event, vec![lot_id]))
    }

    /// Move the stop of a lot.
    pub fn stop(
        &mut self,
        ticker: &str,
        new_stop: Decimal,
        lot: Option<LotId>,
        free_text: &str,
        date: NaiveDate,
    ) -> Result<Recorded, AppError> {
        let ticker = parse_ticker(ticker)?;
        let (sequence, mut replayer) = self.load()?;
        let lot_id = self.resolve(&replayer, EventKind::Stop, &ticker, lot)?;
        let note = note::encode(NoteVerb::Stop, Some(lot_id), free_text);
        let event = build_event(sequence, date, &ticker, Action::Stop { stop: new_stop }, note)?;
        self.commit(&mut replayer, &event)?;
        Ok(finish(replayer, event, vec![lot_id]))
    }

    /// Divide a lot's remaining quantity into new lots with their own stops.
    pub fn split(
        &mut self,
        ticker: &str,
        parts: Vec<SplitPart>,
        lot: Option<LotId>,
        free_text: &str,
        date: NaiveDate,
    ) -> Result<Recorded, AppError> {
        let ticker = parse_ticker(ticker)?;
        let (sequence, mut replayer) = self.load()?;
        let lot_id = self.resolve(&replayer, EventKind::Split, &ticker, lot)?;
        let note = note::encode_split(Some(lot_id), &parts, free_text);
        let event = build_event(sequence, date, &ticker, Action::Split { parts }, note)?;
        self.commit(&mut replayer, &event)?;

        let lot_ids = replayer
            .store()
            .lots(&ticker)
            .filter(|lot| lot.split_from == Some(lot_id))
            .map(|lot| lot.lot_id)
            .collect();
        Ok(finish(replayer, event, lot_ids))
    }

    /// Replay the stored log and compute the sequence for the next entry.
    fn load(&self) -> Result<(Sequence, Replayer), AppError> {
        let events = self.ledger.load_events()?;
        let replayer = Replayer::from_events(&events, self.policy)?;
        Ok((next_sequence(&events), replayer))
    }

    fn resolve(
        &self,
        replayer: &Replayer,
        kind: EventKind,
        ticker: &Ticker,
        lot: Option<LotId>,
    ) -> Result<LotId, AppError> {
        self.policy
            .resolve(replayer.store(), ticker, lot)
            .map_err(|source| {
                warn!(%kind, %ticker, error = %source, "Could not resolve lot");
                AppError::Rejected {
                    kind,
                    ticker: ticker.clone(),
                    source,
                }
            })
    }

    /// Apply the candidate on top of the replayed log, then append it.
    fn commit(&mut self, replayer: &mut Replayer, event: &Event) -> Result<(), AppError> {
        // The resulting book must also still summarize, or every later report would fail.
        let checked = replayer
            .apply(event)
            .map_err(|err| err.source)
            .and_then(|()| summarize(replayer.store()).map(|_| ()));
        if let Err(source) = checked {
            warn!(seq = %event.sequence, kind = %event.kind(), ticker = %event.ticker, error = %source, "Rejected ledger entry");
            return Err(AppError::Rejected {
                kind: event.kind(),
                ticker: event.ticker.clone(),
                source,
            });
        }

        self.ledger.append_event(event)?;
        info!(seq = %event.sequence, kind = %event.kind(), ticker = %event.ticker, note = %event.note, "Appended ledger entry");
        Ok(())
    }
}

fn build_event(
    sequence: Sequence,
    date: NaiveDate,
    ticker: &Ticker,
    action: Action,
    note: String,
) -> Result<Event, AppError> {
    Ok(Event::new(sequence, date, ticker.clone(), action, note)?)
}

fn finish(replayer: Replayer, event: Event, lot_ids: Vec<LotId>) -> Recorded {
    Recorded {
        event,
        lot_ids,
        outcome: replayer.into_outcome(),
    }
}

fn parse_ticker(raw: &str) -> Result<Ticker, AppError> {
    Ticker::new(raw).ok_or_else(|| AppError::BadRequest("ticker must not be empty".to_string()))
}
