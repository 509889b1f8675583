//! JetStream implementation of the `EventPublisher` trait.

use async_nats::jetstream;
use async_trait::async_trait;
use bytes::Bytes;
use games_core::error::DomainError;
use games_core::message::BusMessage;
use games_core::publisher::EventPublisher;
use games_core::repository::StoredEvent;
use tracing::debug;
use uuid::Uuid;

use crate::headers::encode_headers;
use crate::settings::BusSettings;

/// Publishes events to a JetStream stream and waits for the broker's
/// acknowledgement.
#[derive(Clone)]
pub struct NatsEventPublisher {
    context: jetstream::Context,
    settings: BusSettings,
}

impl NatsEventPublisher {
    /// Creates a publisher over an existing JetStream context.
    #[must_use]
    pub fn new(context: jetstream::Context, settings: BusSettings) -> Self {
        Self { context, settings }
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(
        &self,
        event: &StoredEvent,
        subject: &str,
        correlation_id: Uuid,
    ) -> Result<(), DomainError> {
        let message = BusMessage::from_stored_event(event, subject, correlation_id)?;
        let routing_subject = self.settings.routing_subject(subject);
        let headers = encode_headers(&message);

        let ack = self
            .context
            .publish_with_headers(routing_subject.clone(), headers, Bytes::from(message.body))
            .await
            .map_err(|e| DomainError::Publish(format!("publish to {routing_subject} failed: {e}")))?
            .await
            .map_err(|e| {
                DomainError::Publish(format!("broker did not acknowledge {routing_subject}: {e}"))
            })?;

        debug!(
            routing_subject = %routing_subject,
            event_id = %event.event_id,
            correlation_id = %correlation_id,
            stream_sequence = ack.sequence,
            duplicate = ack.duplicate,
            "event published"
        );
        Ok(())
    }
}
