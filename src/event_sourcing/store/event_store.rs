use std::collections::HashMap;
use std::marker::PhantomData;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event_sourcing::core::{DomainEvent, EventEnvelope};

// ============================================================================
// In-Memory Event Store - Audit log of every aggregate stream
// ============================================================================
//
// Responsibilities:
// 1. Append events to a per-aggregate stream (append-only)
// 2. Load event history for aggregates
// 3. Ensure optimistic concurrency control
//
// Durable storage is outside this crate; the store keeps streams in memory.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error("Cannot append empty event list")]
    EmptyAppend,

    #[error("Concurrency conflict on {aggregate_id}: expected version {expected}, but current is {actual}")]
    ConcurrencyConflict {
        aggregate_id: Uuid,
        expected: i64,
        actual: i64,
    },

    #[error("Out of order sequence number {found} on {aggregate_id}, expected {expected}")]
    SequenceGap {
        aggregate_id: Uuid,
        expected: i64,
        found: i64,
    },
}

pub struct EventStore<E: DomainEvent> {
    aggregate_type_name: String, // e.g. "Cart"
    streams: RwLock<HashMap<Uuid, Vec<EventEnvelope<E>>>>,
    _phantom: PhantomData<E>,
}

impl<E: DomainEvent> EventStore<E> {
    pub fn new(aggregate_type_name: &str) -> Self {
        Self {
            aggregate_type_name: aggregate_type_name.to_string(),
            streams: RwLock::new(HashMap::new()),
            _phantom: PhantomData,
        }
    }

    /// Append events to an aggregate stream.
    /// Returns the new version number after appending.
    pub async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64, EventStoreError> {
        if events.is_empty() {
            return Err(EventStoreError::EmptyAppend);
        }

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();

        let current_version = stream.last().map_or(0, |e| e.sequence_number);
        if current_version != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current_version,
            });
        }

        let mut new_version = expected_version;
        for envelope in &events {
            new_version += 1;
            if envelope.sequence_number != new_version {
                return Err(EventStoreError::SequenceGap {
                    aggregate_id,
                    expected: new_version,
                    found: envelope.sequence_number,
                });
            }
        }

        let event_count = events.len();
        stream.extend(events);

        tracing::debug!(
            aggregate_id = %aggregate_id,
            aggregate_type = %self.aggregate_type_name,
            new_version = new_version,
            event_count = event_count,
            "Appended events to event store"
        );

        Ok(new_version)
    }

    /// Load all events for an aggregate, ordered by sequence number
    pub async fn load_events(&self, aggregate_id: Uuid) -> Vec<EventEnvelope<E>> {
        self.streams
            .read()
            .await
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Clone, Debug)]
    struct Counted(i32);

    impl DomainEvent for Counted {
        fn event_type(&self) -> &'static str { "Counted" }
    }

    fn envelopes(aggregate_id: Uuid, from: i64, count: i64) -> Vec<EventEnvelope<Counted>> {
        let correlation_id = Uuid::new_v4();
        (0..count)
            .map(|i| EventEnvelope::new(aggregate_id, from + i, Counted(i as i32), correlation_id))
            .collect()
    }

    #[tokio::test]
    async fn test_append_and_load_in_order() {
        let store = EventStore::<Counted>::new("Test");
        let id = Uuid::new_v4();

        let v = store.append_events(id, 0, envelopes(id, 1, 2)).await.unwrap();
        assert_eq!(v, 2);
        let v = store.append_events(id, 2, envelopes(id, 3, 1)).await.unwrap();
        assert_eq!(v, 3);

        let events = store.load_events(id).await;
        let seqs: Vec<i64> = events.iter().map(|e| e.sequence_number).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_concurrency_conflict_detected() {
        let store = EventStore::<Counted>::new("Test");
        let id = Uuid::new_v4();

        store.append_events(id, 0, envelopes(id, 1, 1)).await.unwrap();
        let err = store.append_events(id, 0, envelopes(id, 1, 1)).await.unwrap_err();

        assert!(matches!(
            err,
            EventStoreError::ConcurrencyConflict { expected: 0, actual: 1, .. }
        ));
        assert_eq!(store.load_events(id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_sequence_gap_rejected() {
        let store = EventStore::<Counted>::new("Test");
        let id = Uuid::new_v4();

        let err = store.append_events(id, 0, envelopes(id, 2, 1)).await.unwrap_err();
        assert!(matches!(err, EventStoreError::SequenceGap { expected: 1, found: 2, .. }));
        assert!(store.load_events(id).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_append_rejected() {
        let store = EventStore::<Counted>::new("Test");
        let err = store.append_events(Uuid::new_v4(), 0, vec![]).await.unwrap_err();
        assert!(matches!(err, EventStoreError::EmptyAppend));
    }

    #[tokio::test]
    async fn test_streams_are_isolated() {
        let store = EventStore::<Counted>::new("Test");
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.append_events(a, 0, envelopes(a, 1, 3)).await.unwrap();
        store.append_events(b, 0, envelopes(b, 1, 1)).await.unwrap();

        assert_eq!(store.load_events(a).await.len(), 3);
        assert_eq!(store.load_events(b).await.len(), 1);
        assert!(store.load_events(Uuid::new_v4()).await.is_empty());

        // b's stream is at version 1 regardless of a's length
        assert_eq!(store.append_events(b, 1, envelopes(b, 2, 1)).await.unwrap(), 2);
    }
}
