use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A process-unique event identifier.
///
/// Rendered as `<arrival millis>-<salt>-<sequence>`. The arrival time keeps ids
/// roughly sortable for humans; uniqueness comes from the sequence alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out `EventId`s that are never repeated within the lifetime of the generator.
///
/// The sequence is an atomic counter that is never reset, not even when the
/// event store is cleared. The salt is derived from the generator's start time
/// so ids from two consecutive processes are distinguishable.
#[derive(Debug)]
pub struct IdGenerator {
    salt: u32,
    sequence: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        let started = Utc::now();
        Self::with_salt(started.timestamp_subsec_nanos() ^ started.timestamp() as u32)
    }

    pub fn with_salt(salt: u32) -> Self {
        Self {
            salt,
            sequence: AtomicU64::new(0),
        }
    }

    /// Allocates the next id for an event that arrived at `received_at`.
    pub fn next_id(&self, received_at: DateTime<Utc>) -> EventId {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        EventId(format!(
            "{}-{:08x}-{}",
            received_at.timestamp_millis(),
            self.salt,
            seq
        ))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_within_the_same_tick_are_distinct() {
        let ids = IdGenerator::with_salt(7);
        let now = Utc::now();
        let a = ids.next_id(now);
        let b = ids.next_id(now);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(&now.timestamp_millis().to_string()));
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let ids = Arc::new(IdGenerator::new());
        let now = Utc::now();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_id(now)).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id generated");
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn serializes_as_a_plain_string() {
        let ids = IdGenerator::with_salt(0xabc);
        let id = ids.next_id(DateTime::from_timestamp_millis(1_700_000_000_000).unwrap());
        assert_eq!(
            serde_json::to_value(&id).unwrap(),
            serde_json::json!("1700000000000-00000abc-0")
        );
    }
}
