//! # Hookline Core Types
//!
//! The foundational data structures shared by every other crate: the stored
//! `WebhookEvent`, its `Category`, the process-unique `EventId`, and the pure
//! `classify` function that assigns categories at ingestion time.

pub mod classifier;
pub mod enums;
pub mod id;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use classifier::classify;
pub use enums::Category;
pub use id::{EventId, IdGenerator};
pub use structs::{EventHeaders, IncomingEvent, Payload, WebhookEvent};
