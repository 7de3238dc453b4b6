//! Replay ordering: events are applied by ascending sequence, never by date.

use crate::domain::{Event, Sequence};

/// Sort events by sequence. The sort is stable, so equal sequences keep input order.
pub fn sort_events_by_sequence(events: &mut [Event]) {
    events.sort_by_key(|event| event.sequence);
}

/// Sequence to assign to the next appended event.
pub fn next_sequence(events: &[Event]) -> Sequence {
    events
        .iter()
        .map(|event| event.sequence)
        .max()
        .map(|seq| seq.next())
        .unwrap_or(Sequence::new(1))
}
