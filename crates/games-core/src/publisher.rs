//! Event publisher abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// At-least-once delivery of stored events to the message bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Serializes `event`, attaches `subject` and `correlation_id` as
    /// message-level metadata, and hands it to the bus.
    ///
    /// Returns once the broker has accepted the message; delivery to
    /// subscribers is not awaited. Broker and serialization failures are
    /// returned as `DomainError::Publish`.
    async fn publish(
        &self,
        event: &StoredEvent,
        subject: &str,
        correlation_id: Uuid,
    ) -> Result<(), DomainError>;
}
