//! Event store abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a domain event (an event log entry).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Zero-based version within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID supplied by the original caller.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing event/command.
    pub causation_id: Uuid,
    /// Server-assigned timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Append-only, per-aggregate, version-checked event log.
///
/// Entries are never updated or deleted once appended.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load all events for a given aggregate, ordered by version ascending.
    /// Returns an empty vector for an aggregate that was never written.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Append new events to an aggregate stream with optimistic concurrency.
    ///
    /// `expected_version` is the number of events already stored for the
    /// aggregate; the first appended event must carry it as its sequence
    /// number. Fails with `DomainError::ConcurrencyConflict` when another
    /// writer got there first.
    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Lists every aggregate that has at least one stored event.
    async fn aggregate_ids(&self) -> Result<Vec<Uuid>, DomainError>;
}
