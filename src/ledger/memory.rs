//! In-memory ledger for tests and dry runs.

use super::{EventSink, EventSource, LedgerStoreError};
use crate::domain::Event;

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    events: Vec<Event>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the ledger.
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Add multiple events to the ledger.
    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for MemoryLedger {
    fn load_events(&self) -> Result<Vec<Event>, LedgerStoreError> {
        Ok(self.events.clone())
    }
}

impl EventSink for MemoryLedger {
    fn append_event(&mut self, event: &Event) -> Result<(), LedgerStoreError> {
        self.events.push(event.clone());
        Ok(())
    }
}
