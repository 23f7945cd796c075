use crate::classifier::classify;
use crate::enums::Category;
use crate::id::EventId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// The body of a webhook, normalised at the HTTP boundary.
///
/// Serialized untagged, so structured payloads appear as the original JSON and
/// text payloads appear as a JSON string holding the verbatim body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Structured(Value),
    Text(String),
}

impl Payload {
    /// The payload stored for a request without a body.
    pub fn empty() -> Self {
        Payload::Structured(Value::Object(Default::default()))
    }
}

/// The transport metadata captured alongside each webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeaders {
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
}

/// Everything the ingestion endpoint extracts from a request before the store
/// assigns identity and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingEvent {
    pub payload: Payload,
    pub source_addr: String,
    pub headers: EventHeaders,
}

/// A single ingested webhook as it lives in the event store and travels over the push channel.
///
/// All fields are fixed at construction; the store only ever moves whole events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub id: EventId,
    pub received_at: DateTime<Utc>,
    pub category: Category,
    pub payload: Payload,
    pub source_addr: String,
    pub headers: EventHeaders,
}

impl WebhookEvent {
    /// Stamps an incoming webhook with its identity and classifies its payload.
    pub fn new(id: EventId, received_at: DateTime<Utc>, incoming: IncomingEvent) -> Self {
        let category = classify(&incoming.payload);
        Self {
            id,
            received_at,
            category,
            payload: incoming.payload,
            source_addr: incoming.source_addr,
            headers: incoming.headers,
        }
    }
}
