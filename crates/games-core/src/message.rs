//! Message bus envelope and inbound delivery contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// Content type of every message body the service publishes.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Wire envelope used for publish/subscribe.
///
/// Routing metadata lives beside the body so the bus and the consumer can
/// dispatch without deserializing the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    /// Event-type discriminator used for dispatch.
    pub subject: String,
    /// Correlation ID propagated from the original command.
    pub correlation_id: Uuid,
    /// MIME type of `body`.
    pub content_type: String,
    /// Fully qualified event name.
    pub event_name: String,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
    /// The stored event this message carries, when known.
    pub event_id: Option<Uuid>,
    /// The aggregate the event belongs to, when known.
    pub aggregate_id: Option<Uuid>,
    /// The event's version within its aggregate, when known.
    pub version: Option<i64>,
    /// Serialized event payload.
    pub body: Vec<u8>,
}

impl BusMessage {
    /// Builds the outbound message for a stored event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Publish` if the payload cannot be serialized.
    pub fn from_stored_event(
        event: &StoredEvent,
        subject: &str,
        correlation_id: Uuid,
    ) -> Result<Self, DomainError> {
        let body = serde_json::to_vec(&event.payload)
            .map_err(|e| DomainError::Publish(format!("payload serialization failed: {e}")))?;
        Ok(Self {
            subject: subject.to_owned(),
            correlation_id,
            content_type: CONTENT_TYPE_JSON.to_owned(),
            event_name: event.event_type.clone(),
            occurred_at: event.occurred_at,
            event_id: Some(event.event_id),
            aggregate_id: Some(event.aggregate_id),
            version: Some(event.sequence_number),
            body,
        })
    }
}

/// A message received from the bus that must be explicitly acknowledged.
///
/// Dropping a delivery without calling `complete` leaves it eligible for
/// broker-driven redelivery.
#[async_trait]
pub trait InboundDelivery: Send + Sync {
    /// The decoded envelope.
    fn message(&self) -> &BusMessage;

    /// How many times the broker has handed out this message (1 on first delivery).
    fn delivery_attempt(&self) -> u64 {
        1
    }

    /// Acknowledges the message so the broker never redelivers it.
    async fn complete(&self) -> Result<(), DomainError>;
}
