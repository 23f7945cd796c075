use crate::error::EventsError;
use core_types::WebhookEvent;
use serde::Serialize;
use std::sync::Arc;

/// An encoded frame, serialized once and shared by every subscriber queue.
pub type Frame = Arc<str>;

/// The top-level WebSocket message enum.
/// All communication from the server to the client will be one of these variants.
///
/// Internally tagged so each frame is a flat JSON object, e.g.
/// `{ "type": "new_message", "message": { ... }, "messageCount": 7 }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Sent once to a subscriber right after it connects: the full current history, newest first.
    InitialData {
        messages: Vec<WebhookEvent>,
        #[serde(rename = "messageCount")]
        message_count: u64,
    },
    /// A webhook has just been stored.
    NewMessage {
        message: WebhookEvent,
        #[serde(rename = "messageCount")]
        message_count: u64,
    },
    /// The history was cleared; the counter is back to zero.
    MessagesCleared {
        #[serde(rename = "messageCount")]
        message_count: u64,
    },
}

impl WsMessage {
    pub fn cleared() -> Self {
        WsMessage::MessagesCleared { message_count: 0 }
    }

    /// Encodes the message as a JSON text frame.
    pub fn to_frame(&self) -> Result<Frame, EventsError> {
        Ok(Arc::from(serde_json::to_string(self)?))
    }
}
