use crate::domain::{sort_events_by_sequence, Action, Decimal, Event, LotId, Sequence, SplitPart};
use tracing::debug;

use super::lot_store::overflow;
use super::{LedgerError, LotStore, MatchPolicy, ReplayError};

/// Final state of a successful replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub store: LotStore,
    pub total_realized_pnl: Decimal,
    pub events_applied: usize,
}

/// Folds events into a lot store, one event at a time.
///
/// Each event either applies completely or returns an error with the store
/// unchanged. Events must arrive in strictly increasing sequence order.
#[derive(Debug, Clone)]
pub struct Replayer {
    store: LotStore,
    policy: MatchPolicy,
    total_realized_pnl: Decimal,
    events_applied: usize,
    last_sequence: Option<Sequence>,
}

impl Replayer {
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            store: LotStore::new(),
            policy,
            total_realized_pnl: Decimal::zero(),
            events_applied: 0,
            last_sequence: None,
        }
    }

    /// Build a replayer holding the state after every event in `events`.
    ///
    /// Events are sorted by sequence first; the input order does not matter.
    pub fn from_events(events: &[Event], policy: MatchPolicy) -> Result<Self, ReplayError> {
        let mut ordered = events.to_vec();
        sort_events_by_sequence(&mut ordered);

        let mut replayer = Replayer::new(policy);
        for event in &ordered {
            replayer.apply(event)?;
        }
        Ok(replayer)
    }

    /// Apply a single event.
    pub fn apply(&mut self, event: &Event) -> Result<(), ReplayError> {
        self.apply_inner(event)
            .map_err(|source| ReplayError::new(event.sequence, source))?;
        self.last_sequence = Some(event.sequence);
        self.events_applied += 1;
        Ok(())
    }

    fn apply_inner(&mut self, event: &Event) -> Result<(), LedgerError> {
        if let Some(last) = self.last_sequence {
            if event.sequence <= last {
                return Err(LedgerError::MalformedEvent(format!(
                    "sequence {} does not follow {}",
                    event.sequence, last
                )));
            }
        }

        debug!(seq = %event.sequence, kind = %event.kind(), ticker = %event.ticker, "Applying event");

        match &event.action {
            Action::Open {
                quantity,
                price,
                stop,
            } => {
                self.handle_open(event, *quantity, *price, *stop);
                Ok(())
            }
            Action::Trim { quantity, price } => self.handle_trim(event, *quantity, *price),
            Action::Close { price, .. } => self.handle_close(event, *price),
            Action::Stop { stop } => self.handle_stop(event, *stop),
            Action::Split { parts } => self.handle_split(event, parts),
        }
    }

    fn resolve(&self, event: &Event) -> Result<LotId, LedgerError> {
        self.policy
            .resolve(&self.store, &event.ticker, event.target)
    }

    fn handle_open(&mut self, event: &Event, quantity: Decimal, price: Decimal, stop: Decimal) {
        let lot_id = self.store.create_lot(&event.ticker, price, stop, quantity);
        debug!(ticker = %event.ticker, lot = %lot_id, %quantity, %price, %stop, "Opened lot");
    }

    fn handle_trim(
        &mut self,
        event: &Event,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<(), LedgerError> {
        let lot_id = self.resolve(event)?;
        let delta = self.book_trim(event, lot_id, quantity, price)?;
        debug!(ticker = %event.ticker, lot = %lot_id, %quantity, %price, pnl = %delta, "Trimmed lot");
        Ok(())
    }

    /// Check the trim and the new running total, then apply both.
    fn book_trim(
        &mut self,
        event: &Event,
        lot_id: LotId,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let delta = self
            .store
            .trim_pnl(&event.ticker, lot_id, quantity, price)?;
        let total = self
            .total_realized_pnl
            .checked_add(delta)
            .ok_or_else(|| overflow(&event.ticker, "total realized P&L"))?;
        self.store
            .apply_trim(&event.ticker, lot_id, quantity, price)?;
        self.total_realized_pnl = total;
        Ok(delta)
    }

    /// A close is a trim of whatever the lot still holds; the recorded quantity is ignored.
    fn handle_close(&mut self, event: &Event, price: Decimal) -> Result<(), LedgerError> {
        let lot_id = self.resolve(event)?;
        let remaining = self
            .store
            .get(&event.ticker, lot_id)
            .filter(|lot| lot.is_open())
            .map(|lot| lot.open_quantity)
            .ok_or_else(|| LedgerError::UnknownLot {
                ticker: event.ticker.clone(),
                lot_id,
            })?;
        let delta = self.book_trim(event, lot_id, remaining, price)?;
        debug!(ticker = %event.ticker, lot = %lot_id, quantity = %remaining, %price, pnl = %delta, "Closed lot");
        Ok(())
    }

    fn handle_stop(&mut self, event: &Event, stop: Decimal) -> Result<(), LedgerError> {
        let lot_id = self.resolve(event)?;
        self.store.apply_stop(&event.ticker, lot_id, stop)?;
        debug!(ticker = %event.ticker, lot = %lot_id, %stop, "Moved stop");
        Ok(())
    }

    /// The first part continues the position under a new id; later parts are new tranches.
    fn handle_split(&mut self, event: &Event, parts: &[SplitPart]) -> Result<(), LedgerError> {
        let lot_id = self.resolve(event)?;
        let new_ids = self.store.apply_split(&event.ticker, lot_id, parts)?;
        debug!(ticker = %event.ticker, lot = %lot_id, into = ?new_ids, "Split lot");
        Ok(())
    }

    pub fn store(&self) -> &LotStore {
        &self.store
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn total_realized_pnl(&self) -> Decimal {
        self.total_realized_pnl
    }

    pub fn into_outcome(self) -> ReplayOutcome {
        ReplayOutcome {
            store: self.store,
            total_realized_pnl: self.total_realized_pnl,
            events_applied: self.events_applied,
        }
    }
}

impl Default for Replayer {
    fn default() -> Self {
        Self::new(MatchPolicy::default())
    }
}

/// Replay the full log with the default match policy.
pub fn replay(events: &[Event]) -> Result<ReplayOutcome, ReplayError> {
    replay_with_policy(events, MatchPolicy::default())
}

/// Replay the full log in ascending sequence order.
///
/// Fails fast: the first event that cannot be applied aborts the replay and no
/// partial state is returned. A repeated sequence number is a malformed event.
pub fn replay_with_policy(
    events: &[Event],
    policy: MatchPolicy,
) -> Result<ReplayOutcome, ReplayError> {
    Replayer::from_events(events, policy).map(Replayer::into_outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Ticker, EventKind};
    use crate::engine::LotStatus;
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn event(seq: u64, action: Action, note: &str) -> Event {
        Event::new(
            Sequence::new(seq),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            Ticker::new("qqq").unwrap(),
            action,
            note,
        )
        .unwrap()
    }

    fn close(price: Decimal) -> Action {
        Action::Close {
            quantity: Decimal::zero(),
            price,
        }
    }

    fn open(seq: u64, qty: &str, price: &str, stop: &str) -> Event {
        event(
            seq,
            Action::Open {
                quantity: d(qty),
                price: d(price),
                stop: d(stop),
            },
            "",
        )
    }

    #[test]
    fn test_replay_sorts_by_sequence() {
        let events = vec![
            event(
                2,
                Action::Trim {
                    quantity: d("4"),
                    price: d("110"),
                },
                "trim id=1",
            ),
            open(1, "10", "100", "90"),
        ];
        let outcome = replay(&events).unwrap();
        assert_eq!(outcome.events_applied, 2);
        assert_eq!(outcome.total_realized_pnl, d("40"));
    }

    #[test]
    fn test_repeated_sequence_is_malformed() {
        let events = vec![open(1, "10", "100", "90"), open(1, "5", "101", "90")];
        let err = replay(&events).unwrap_err();
        assert_eq!(err.sequence, Sequence::new(1));
        assert!(matches!(err.kind(), LedgerError::MalformedEvent(_)));
    }

    #[test]
    fn test_replayer_rejects_out_of_order_apply() {
        let mut replayer = Replayer::default();
        replayer.apply(&open(5, "1", "1", "0")).unwrap();
        let err = replayer.apply(&open(3, "1", "1", "0")).unwrap_err();
        assert!(matches!(err.kind(), LedgerError::MalformedEvent(_)));
        assert_eq!(
            replayer
                .store()
                .open_quantity(&Ticker::new("QQQ").unwrap())
                .unwrap(),
            d("1")
        );
    }

    #[test]
    fn test_close_on_closed_lot_is_unknown() {
        let events = vec![
            open(1, "2", "100", "90"),
            event(2, close(d("105")), "close id=1"),
            event(3, close(d("106")), "close id=1"),
        ];
        let err = replay(&events).unwrap_err();
        assert_eq!(err.sequence, Sequence::new(3));
        assert!(matches!(err.kind(), LedgerError::UnknownLot { .. }));
    }

    #[test]
    fn test_implicit_close_uses_single_open_lot() {
        let events = vec![
            open(1, "2", "100", "90"),
            event(2, close(d("105")), "all out"),
        ];
        let outcome = replay(&events).unwrap();
        let lot = outcome
            .store
            .get(&Ticker::new("QQQ").unwrap(), LotId::new(1))
            .unwrap();
        assert_eq!(lot.status, LotStatus::Closed);
        assert_eq!(outcome.total_realized_pnl, d("10"));
    }

    #[test]
    fn test_explicit_only_policy_rejects_implicit_stop() {
        let events = vec![
            open(1, "2", "100", "90"),
            event(2, Action::Stop { stop: d("95") }, "tighten"),
        ];
        assert!(replay(&events).is_ok());

        let err = replay_with_policy(&events, MatchPolicy::ExplicitOnly).unwrap_err();
        assert!(matches!(err.kind(), LedgerError::MissingLotId { .. }));
        assert_eq!(events[1].kind(), EventKind::Stop);
    }

    #[test]
    fn test_trim_overflow_halts_replay() {
        let max = "79228162514264337593543950335";
        let events = vec![
            open(1, max, "1", "0"),
            event(
                2,
                Action::Trim {
                    quantity: d(max),
                    price: d("3"),
                },
                "trim id=1",
            ),
        ];
        let err = replay(&events).unwrap_err();
        assert_eq!(err.sequence, Sequence::new(2));
        assert!(matches!(
            err.kind(),
            LedgerError::ArithmeticOverflow { .. }
        ));
    }

    #[test]
    fn test_total_overflow_leaves_store_untouched() {
        let half = "50000000000000000000000000000";
        let mut replayer = Replayer::default();
        replayer.apply(&open(1, half, "0", "0")).unwrap();
        replayer.apply(&open(2, half, "0", "0")).unwrap();
        replayer
            .apply(&event(
                3,
                Action::Trim {
                    quantity: d(half),
                    price: d("1"),
                },
                "trim id=1",
            ))
            .unwrap();
        let before = replayer.store().clone();

        let err = replayer.apply(&event(4, close(d("1")), "close id=2")).unwrap_err();
        assert!(matches!(
            err.kind(),
            LedgerError::ArithmeticOverflow { .. }
        ));
        assert_eq!(replayer.store(), &before);
        assert_eq!(replayer.total_realized_pnl(), d(half));
    }
}
