//! # Hookline Events
//!
//! This crate defines the frames pushed over the live WebSocket channel from
//! the server to every connected dashboard.
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the definitive
//! language for all real-time state synchronization.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{Frame, WsMessage};
