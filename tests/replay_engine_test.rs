use chrono::NaiveDate;
use tradingbook::engine::replay_with_policy;
use tradingbook::{
    replay, summarize, Action, Decimal, Event, LedgerError, LotId, LotStatus, MatchPolicy,
    Sequence, SplitPart, Ticker,
};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn qqq() -> Ticker {
    Ticker::new("QQQ").unwrap()
}

fn event(seq: u64, action: Action, note: &str) -> Event {
    Event::new(
        Sequence::new(seq),
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        qqq(),
        action,
        note,
    )
    .unwrap()
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

fn trim(seq: u64, qty: &str, price: &str, note: &str) -> Event {
    event(
        seq,
        Action::Trim {
            quantity: d(qty),
            price: d(price),
        },
        note,
    )
}

fn close(seq: u64, price: &str, note: &str) -> Event {
    event(
        seq,
        Action::Close {
            quantity: Decimal::zero(),
            price: d(price),
        },
        note,
    )
}

#[test]
fn test_open_then_trim_realizes_pnl() {
    let events = vec![
        open(1, "10", "430.25", "418"),
        trim(2, "5", "445.50", "trim id=1"),
    ];
    let outcome = replay(&events).unwrap();
    let lot = outcome.store.get(&qqq(), LotId::new(1)).unwrap();
    assert_eq!(lot.open_quantity, d("5"));
    assert_eq!(lot.realized_pnl, d("76.25"));
    assert_eq!(lot.status, LotStatus::Open);
    assert_eq!(outcome.total_realized_pnl, d("76.25"));
}

#[test]
fn test_close_sells_remaining_quantity() {
    let events = vec![
        open(1, "10", "430.25", "418"),
        trim(2, "5", "445.50", "trim id=1"),
        close(3, "450.0", "close id=1"),
    ];
    let outcome = replay(&events).unwrap();
    let lot = outcome.store.get(&qqq(), LotId::new(1)).unwrap();
    assert!(lot.open_quantity.is_zero());
    assert_eq!(lot.status, LotStatus::Closed);
    assert_eq!(lot.realized_pnl, d("175.00"));
    assert_eq!(outcome.total_realized_pnl, d("175"));
}

#[test]
fn test_split_conserves_quantity() {
    let events = vec![
        open(1, "3", "400", "390"),
        open(2, "10", "425", "410"),
        event(
            3,
            Action::Split {
                parts: vec![
                    SplitPart::new(d("5"), d("420")),
                    SplitPart::new(d("5"), d("415")),
                ],
            },
            "split id=2 parts=5@420,5@415",
        ),
    ];
    let before = replay(&events[..2]).unwrap();
    let outcome = replay(&events).unwrap();
    let store = &outcome.store;

    let source = store.get(&qqq(), LotId::new(2)).unwrap();
    assert_eq!(source.status, LotStatus::Closed);
    assert!(source.open_quantity.is_zero());
    assert!(source.realized_pnl.is_zero());

    for (id, stop) in [(3, "420"), (4, "415")] {
        let lot = store.get(&qqq(), LotId::new(id)).unwrap();
        assert_eq!(lot.open_quantity, d("5"));
        assert_eq!(lot.open_price, d("425"));
        assert_eq!(lot.stop, d(stop));
        assert_eq!(lot.split_from, Some(LotId::new(2)));
    }

    assert_eq!(
        store.open_quantity(&qqq()).unwrap(),
        before.store.open_quantity(&qqq()).unwrap()
    );
    assert!(outcome.total_realized_pnl.is_zero());
}

#[test]
fn test_split_with_wrong_total_fails() {
    let events = vec![
        open(1, "10", "425", "410"),
        event(
            2,
            Action::Split {
                parts: vec![
                    SplitPart::new(d("5"), d("420")),
                    SplitPart::new(d("4"), d("415")),
                ],
            },
            "split id=1 parts=5@420,4@415",
        ),
    ];
    let err = replay(&events).unwrap_err();
    assert_eq!(err.sequence, Sequence::new(2));
    assert!(matches!(
        err.kind(),
        LedgerError::InsufficientQuantity { .. }
    ));
}

#[test]
fn test_implicit_trim_with_two_open_lots_is_ambiguous() {
    let events = vec![
        open(1, "5", "100", "90"),
        open(2, "5", "101", "90"),
        trim(3, "1", "110", "taking some off"),
    ];
    let err = replay(&events).unwrap_err();
    assert!(matches!(
        err.kind(),
        LedgerError::AmbiguousLot { open_lots: 2, .. }
    ));
}

#[test]
fn test_implicit_trim_without_open_lot() {
    let events = vec![trim(1, "1", "110", "")];
    let err = replay(&events).unwrap_err();
    assert!(matches!(err.kind(), LedgerError::NoOpenLot { .. }));
}

#[test]
fn test_unknown_lot_id() {
    let events = vec![open(1, "5", "100", "90"), trim(2, "1", "110", "trim id=7")];
    let err = replay(&events).unwrap_err();
    assert!(matches!(
        err.kind(),
        LedgerError::UnknownLot { lot_id, .. } if *lot_id == LotId::new(7)
    ));
}

#[test]
fn test_trim_over_remaining_leaves_lot_unchanged() {
    let events = vec![open(1, "5", "100", "90")];
    let mut replayer = tradingbook::engine::Replayer::from_events(&events, MatchPolicy::default())
        .unwrap();
    let before = replayer.store().fingerprint();

    let err = replayer
        .apply(&trim(2, "6", "110", "trim id=1"))
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        LedgerError::InsufficientQuantity { .. }
    ));
    assert_eq!(replayer.store().fingerprint(), before);
    assert_eq!(
        replayer.store().get(&qqq(), LotId::new(1)).unwrap().open_quantity,
        d("5")
    );
}

#[test]
fn test_opens_sum_to_position_size() {
    let quantities = ["1", "2.5", "0.125", "100", "7"];
    let events: Vec<Event> = quantities
        .iter()
        .enumerate()
        .map(|(i, q)| open(i as u64 + 1, q, "10", "9"))
        .collect();
    let outcome = replay(&events).unwrap();
    let expected: Decimal = quantities.iter().map(|q| d(q)).sum();
    assert_eq!(outcome.store.open_quantity(&qqq()).unwrap(), expected);

    let ids: Vec<u64> = outcome
        .store
        .lots(&qqq())
        .map(|lot| lot.lot_id.as_u64())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_lot_ids_are_never_reused() {
    let events = vec![
        open(1, "5", "100", "90"),
        open(2, "5", "100", "90"),
        close(3, "105", "close id=2"),
        open(4, "1", "100", "90"),
    ];
    let outcome = replay(&events).unwrap();
    assert!(outcome.store.get(&qqq(), LotId::new(3)).unwrap().is_open());
    assert_eq!(
        outcome.store.get(&qqq(), LotId::new(2)).unwrap().status,
        LotStatus::Closed
    );
}

#[test]
fn test_replay_is_deterministic() {
    let events = vec![
        open(1, "10", "430.25", "418"),
        trim(2, "5", "445.50", "trim id=1"),
        event(3, Action::Stop { stop: d("425") }, "stop id=1"),
        open(4, "4", "440", "430"),
    ];
    let first = replay(&events).unwrap();
    let second = replay(&events).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.store.fingerprint(), second.store.fingerprint());

    let mut shuffled = events.clone();
    shuffled.reverse();
    let third = replay(&shuffled).unwrap();
    assert_eq!(third.store.fingerprint(), first.store.fingerprint());
}

#[test]
fn test_explicit_only_policy() {
    let events = vec![
        open(1, "10", "100", "90"),
        trim(2, "5", "110", "sold half"),
    ];
    assert!(replay(&events).is_ok());
    let err = replay_with_policy(&events, MatchPolicy::ExplicitOnly).unwrap_err();
    assert!(matches!(err.kind(), LedgerError::MissingLotId { .. }));
}

#[test]
fn test_report_aggregates() {
    let events = vec![
        open(1, "10", "100", "90"),
        open(2, "30", "110", "100"),
        trim(3, "10", "120", "trim id=2"),
    ];
    let outcome = replay(&events).unwrap();
    let report = summarize(&outcome.store).unwrap();
    let summary = &report.tickers[&qqq()];
    assert_eq!(summary.open_quantity, d("30"));
    // (10 * 100 + 20 * 110) / 30
    assert_eq!(
        summary.average_open_price.unwrap().round_dp(4),
        d("106.6667")
    );
    assert_eq!(
        summary.average_stop.unwrap().round_dp(4),
        d("96.6667")
    );
    assert_eq!(summary.risk_to_stop, d("300"));
    assert_eq!(summary.realized_pnl_total, d("100"));
    assert_eq!(report.total_realized_pnl, d("100"));
}

#[test]
fn test_realized_pnl_never_decreases_without_losing_sells() {
    let events = vec![
        open(1, "10", "100", "90"),
        open(2, "6", "120", "110"),
        trim(3, "2", "100", "trim id=1"),
        trim(4, "3", "135.5", "trim id=2"),
        event(5, Action::Stop { stop: d("101") }, "stop id=1"),
        trim(6, "4", "104.25", "trim id=1"),
        close(7, "120", "close id=2"),
        open(8, "5", "50", "45"),
        close(9, "100", "close id=1"),
        close(10, "61", "close id=3"),
    ];

    let mut previous = Decimal::zero();
    for end in 1..=events.len() {
        let outcome = replay(&events[..end]).unwrap();
        assert!(
            outcome.total_realized_pnl >= previous,
            "realized P&L fell from {} to {} after event {}",
            previous,
            outcome.total_realized_pnl,
            end
        );
        previous = outcome.total_realized_pnl;
    }
    // 3 * 15.5 + 4 * 4.25 + 5 * 11
    assert_eq!(previous, d("118.5"));
}
