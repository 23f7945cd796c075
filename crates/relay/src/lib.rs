//! # Hookline Relay
//!
//! The in-memory core of the service: a bounded event store, a broadcast hub
//! of live subscribers, and the `Relay` that keeps the two consistent.
//!
//! Every mutation of the store and its matching broadcast happen while the
//! store lock is held. Two webhooks therefore reach every subscriber in the
//! same order they were stored, and a subscriber that connects sees either an
//! event in its initial snapshot or as a live frame, never both and never neither.

use crate::error::RelayError;
use chrono::{DateTime, Utc};
use core_types::{IncomingEvent, WebhookEvent};
use events::{Frame, WsMessage};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod error;
pub mod hub;
pub mod store;

pub use hub::{BroadcastHub, DEFAULT_SUBSCRIBER_BUFFER, SubscriberId, Subscription};
pub use store::{EventStore, MAX_CAPACITY, StoreSnapshot};

/// Point-in-time counters for the stats endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayStats {
    pub message_count: u64,
    pub last_message: Option<DateTime<Utc>>,
    pub connected_clients: usize,
}

/// Owns the event store and the broadcast hub for the lifetime of the server.
#[derive(Debug)]
pub struct Relay {
    store: Mutex<EventStore>,
    hub: BroadcastHub,
}

impl Relay {
    pub fn new(capacity: usize, subscriber_buffer: usize) -> Self {
        Self {
            store: Mutex::new(EventStore::new(capacity)),
            hub: BroadcastHub::new(subscriber_buffer),
        }
    }

    // Both this lock and the hub's recover from poisoning. Every store method
    // leaves the deque and counters consistent before it can panic.
    fn store(&self) -> MutexGuard<'_, EventStore> {
        self.store.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Event store lock was poisoned; recovering.");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Stores a webhook and announces it to every subscriber.
    ///
    /// An `Encode` error means the event was stored but not broadcast.
    pub fn ingest(&self, incoming: IncomingEvent) -> Result<WebhookEvent, RelayError> {
        let mut store = self.store();
        let event = store.append(incoming);
        let total_count = store.total_count();

        tracing::info!(
            id = %event.id,
            category = %event.category,
            source = %event.source_addr,
            total_count,
            "Webhook stored."
        );
        tracing::debug!(payload = ?event.payload, "Webhook payload.");

        let delivered = self.hub.publish(&event, total_count)?;
        tracing::debug!(id = %event.id, delivered, "Webhook broadcast.");
        Ok(event)
    }

    /// Registers a new subscriber and encodes the `initial_data` frame it must be sent first.
    pub fn connect(&self) -> Result<(Subscription, Frame), RelayError> {
        let store = self.store();
        let subscription = self.hub.subscribe();
        let snapshot = store.snapshot();
        drop(store);

        let initial = WsMessage::InitialData {
            messages: snapshot.events,
            message_count: snapshot.total_count,
        };
        match initial.to_frame() {
            Ok(frame) => Ok((subscription, frame)),
            Err(e) => {
                self.hub.unsubscribe(subscription.id());
                Err(e.into())
            }
        }
    }

    pub fn disconnect(&self, id: SubscriberId) -> bool {
        self.hub.unsubscribe(id)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store().snapshot()
    }

    /// Empties the store and tells every subscriber.
    pub fn clear(&self) -> Result<(), RelayError> {
        let mut store = self.store();
        store.clear();
        tracing::info!("Event store cleared.");
        self.hub.publish_clear()?;
        Ok(())
    }

    pub fn stats(&self) -> RelayStats {
        let store = self.store();
        RelayStats {
            message_count: store.total_count(),
            last_message: store.last_received_at(),
            connected_clients: self.hub.subscriber_count(),
        }
    }

    /// Closes every subscriber queue so connection tasks finish.
    pub fn shutdown(&self) {
        self.hub.close_all();
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(MAX_CAPACITY, DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Category, EventHeaders, Payload};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn incoming(payload: Value) -> IncomingEvent {
        IncomingEvent {
            payload: Payload::Structured(payload),
            source_addr: "127.0.0.1".to_string(),
            headers: EventHeaders::default(),
        }
    }

    fn decode(frame: &Frame) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn connect_sends_snapshot_then_live_events() {
        let relay = Relay::default();
        relay.ingest(incoming(json!({ "action": "BUY" }))).unwrap();

        let (mut sub, initial) = relay.connect().unwrap();
        let initial = decode(&initial);
        assert_eq!(initial["type"], "initial_data");
        assert_eq!(initial["messageCount"], 1);
        assert_eq!(initial["messages"].as_array().unwrap().len(), 1);

        let event = relay.ingest(incoming(json!({ "symbol": "ETHUSDT" }))).unwrap();
        assert_eq!(event.category, Category::SymbolData);

        let live = decode(&sub.recv().await.unwrap());
        assert_eq!(live["type"], "new_message");
        assert_eq!(live["message"]["id"], event.id.as_str());
        assert_eq!(live["messageCount"], 2);
    }

    #[tokio::test]
    async fn concurrent_ingestion_is_broadcast_in_store_order() {
        let relay = Arc::new(Relay::new(MAX_CAPACITY, 1024));
        let (mut sub, _) = relay.connect().unwrap();

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let relay = Arc::clone(&relay);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        relay.ingest(incoming(json!({ "writer": w, "n": n }))).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let mut broadcast_ids = Vec::new();
        for expected_count in 1..=200u64 {
            let frame = decode(&sub.recv().await.unwrap());
            assert_eq!(frame["messageCount"], expected_count);
            broadcast_ids.push(frame["message"]["id"].as_str().unwrap().to_string());
        }

        let snapshot = relay.snapshot();
        let mut stored_ids: Vec<String> = snapshot
            .events
            .iter()
            .map(|e| e.id.to_string())
            .collect();
        stored_ids.reverse();
        assert_eq!(&broadcast_ids[100..], stored_ids.as_slice());
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_fail_ingestion() {
        let relay = Relay::default();
        let (gone, _) = relay.connect().unwrap();
        let (mut alive, _) = relay.connect().unwrap();
        drop(gone);

        assert!(relay.ingest(incoming(json!({ "signal": "long" }))).is_ok());
        assert!(alive.recv().await.is_some());
        assert_eq!(relay.stats().connected_clients, 1);
    }

    #[tokio::test]
    async fn clear_resets_counters_and_notifies() {
        let relay = Relay::default();
        let (mut sub, _) = relay.connect().unwrap();
        relay.ingest(incoming(json!({ "strategy": "grid" }))).unwrap();
        assert!(sub.recv().await.is_some());

        relay.clear().unwrap();
        relay.clear().unwrap();

        let stats = relay.stats();
        assert_eq!(stats.message_count, 0);
        assert!(stats.last_message.is_none());
        assert_eq!(relay.snapshot(), StoreSnapshot::default());
        assert_eq!(decode(&sub.recv().await.unwrap())["type"], "messages_cleared");
    }

    #[tokio::test]
    async fn disconnect_and_shutdown_release_subscribers() {
        let relay = Relay::default();
        let (a, _) = relay.connect().unwrap();
        let (mut b, _) = relay.connect().unwrap();

        assert!(relay.disconnect(a.id()));
        assert!(!relay.disconnect(a.id()));
        relay.shutdown();

        assert!(b.recv().await.is_none());
        assert_eq!(relay.stats().connected_clients, 0);
    }

    #[tokio::test]
    async fn relay_keeps_serving_after_a_writer_panics_under_the_store_lock() {
        let relay = Arc::new(Relay::default());
        relay.ingest(incoming(json!({ "action": "BUY" }))).unwrap();

        let poisoner = Arc::clone(&relay);
        let outcome = std::thread::spawn(move || {
            let _guard = poisoner.store.lock().unwrap();
            panic!("writer panicked while holding the store lock");
        })
        .join();
        assert!(outcome.is_err());
        assert!(relay.store.is_poisoned());

        let (mut sub, initial) = relay.connect().unwrap();
        assert_eq!(decode(&initial)["messageCount"], 1);

        relay.ingest(incoming(json!({ "symbol": "ETHUSDT" }))).unwrap();
        assert_eq!(decode(&sub.recv().await.unwrap())["messageCount"], 2);
        assert_eq!(relay.stats().message_count, 2);
        assert_eq!(relay.snapshot().events.len(), 2);
    }
}
