use crate::error::RelayError;
use core_types::WebhookEvent;
use events::{Frame, WsMessage};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// The default number of frames a subscriber may fall behind before it is dropped.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

pub type SubscriberId = Uuid;

/// The receiving half handed to a connected subscriber.
///
/// `recv` yields `None` once the hub has dropped this subscriber, either
/// because it fell too far behind or because the hub was shut down.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }
}

/// Registry of live subscriber queues and the fan-out over them.
///
/// Every subscriber gets its own bounded queue. Publishing never waits: a
/// queue that is full or whose receiver is gone gets its subscriber removed,
/// and delivery to the rest carries on.
#[derive(Debug)]
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Frame>>>,
    buffer: usize,
}

impl BroadcastHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    // Membership is a plain map of independent inserts and removes, so a
    // panic elsewhere cannot leave it half-updated.
    fn members(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Frame>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        let count = {
            let mut members = self.members();
            members.insert(id, sender);
            members.len()
        };
        tracing::info!(subscriber = %id, connected = count, "Subscriber registered.");
        Subscription { id, receiver }
    }

    /// Removes a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.members().remove(&id).is_some();
        if removed {
            tracing::info!(subscriber = %id, "Subscriber deregistered.");
        }
        removed
    }

    /// Fans a freshly stored event out to every subscriber.
    /// Returns the number of subscribers the frame was queued for.
    pub fn publish(&self, event: &WebhookEvent, total_count: u64) -> Result<usize, RelayError> {
        self.broadcast(&WsMessage::NewMessage {
            message: event.clone(),
            message_count: total_count,
        })
    }

    pub fn publish_clear(&self) -> Result<usize, RelayError> {
        self.broadcast(&WsMessage::cleared())
    }

    fn broadcast(&self, message: &WsMessage) -> Result<usize, RelayError> {
        let frame = message.to_frame()?;
        let mut members = self.members();
        let mut dropped = Vec::new();

        for (id, sender) in members.iter() {
            match sender.try_send(Frame::clone(&frame)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = %id, "Subscriber queue saturated. Dropping subscriber.");
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = %id, "Subscriber queue closed. Dropping subscriber.");
                    dropped.push(*id);
                }
            }
        }

        for id in &dropped {
            members.remove(id);
        }
        Ok(members.len())
    }

    pub fn subscriber_count(&self) -> usize {
        self.members().len()
    }

    /// Drops every subscriber queue, which ends all subscriber tasks.
    pub fn close_all(&self) -> usize {
        let closed = self.members().drain().count();
        if closed > 0 {
            tracing::info!(closed, "Closed all subscriber queues.");
        }
        closed
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}
