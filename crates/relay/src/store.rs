use chrono::{DateTime, Utc};
use core_types::{IdGenerator, IncomingEvent, WebhookEvent};
use std::collections::VecDeque;

/// The default number of events retained in memory.
pub const MAX_CAPACITY: usize = 100;

/// A stable copy of the store, unaffected by later appends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Newest first.
    pub events: Vec<WebhookEvent>,
    pub total_count: u64,
}

/// Bounded, newest-first history of ingested webhooks plus a lifetime counter.
///
/// Eviction is strictly by insertion order: once `capacity` is reached, each
/// append drops the event that was inserted earliest. The store is not
/// synchronised on its own; `Relay` owns it behind a lock.
#[derive(Debug)]
pub struct EventStore {
    events: VecDeque<WebhookEvent>,
    total_count: u64,
    capacity: usize,
    ids: IdGenerator,
}

impl EventStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            total_count: 0,
            capacity,
            ids: IdGenerator::new(),
        }
    }

    /// Stamps, classifies and stores a webhook at the head of the history.
    pub fn append(&mut self, incoming: IncomingEvent) -> WebhookEvent {
        let received_at = Utc::now();
        let event = WebhookEvent::new(self.ids.next_id(received_at), received_at, incoming);

        self.events.push_front(event.clone());
        while self.events.len() > self.capacity {
            self.events.pop_back();
        }
        self.total_count += 1;

        event
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            events: self.events.iter().cloned().collect(),
            total_count: self.total_count,
        }
    }

    /// Empties the history and resets the counter. Ids keep counting up.
    pub fn clear(&mut self) {
        self.events.clear();
        self.total_count = 0;
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arrival time of the newest event, if any.
    pub fn last_received_at(&self) -> Option<DateTime<Utc>> {
        self.events.front().map(|event| event.received_at)
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(MAX_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{EventHeaders, Payload};
    use serde_json::json;

    fn incoming(n: usize) -> IncomingEvent {
        IncomingEvent {
            payload: Payload::Structured(json!({ "seq": n })),
            source_addr: "127.0.0.1".to_string(),
            headers: EventHeaders::default(),
        }
    }

    #[test]
    fn keeps_the_most_recent_events_newest_first() {
        let mut store = EventStore::default();
        for n in 0..250 {
            store.append(incoming(n));
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_count, 250);
        assert_eq!(snapshot.events.len(), MAX_CAPACITY);

        let seqs: Vec<u64> = snapshot
            .events
            .iter()
            .map(|e| match &e.payload {
                Payload::Structured(v) => v["seq"].as_u64().unwrap(),
                Payload::Text(_) => unreachable!(),
            })
            .collect();
        let expected: Vec<u64> = (150..250).rev().collect();
        assert_eq!(seqs, expected);
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut store = EventStore::new(5);
        store.append(incoming(0));
        let before = store.snapshot();
        store.append(incoming(1));

        assert_eq!(before.events.len(), 1);
        assert_eq!(before.total_count, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut store = EventStore::new(3);
        for n in 0..4 {
            store.append(incoming(n));
        }

        store.clear();
        let once = store.snapshot();
        store.clear();
        let twice = store.snapshot();

        assert_eq!(once, twice);
        assert_eq!(twice, StoreSnapshot::default());
        assert!(store.last_received_at().is_none());
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let mut store = EventStore::new(3);
        let first = store.append(incoming(0));
        store.clear();
        let second = store.append(incoming(1));
        assert_ne!(first.id, second.id);
        assert_eq!(store.total_count(), 1);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut store = EventStore::new(0);
        store.append(incoming(0));
        store.append(incoming(1));
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_count(), 2);
    }
}
