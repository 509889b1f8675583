//! Test publishers: mock `EventPublisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use games_core::error::DomainError;
use games_core::message::BusMessage;
use games_core::publisher::EventPublisher;
use games_core::repository::StoredEvent;
use uuid::Uuid;

/// A publisher that records every message it is asked to publish and always
/// succeeds.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    published: Mutex<Vec<BusMessage>>,
}

impl RecordingEventPublisher {
    /// Create an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all messages that were published.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<BusMessage> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        event: &StoredEvent,
        subject: &str,
        correlation_id: Uuid,
    ) -> Result<(), DomainError> {
        let message = BusMessage::from_stored_event(event, subject, correlation_id)?;
        self.published.lock().unwrap().push(message);
        Ok(())
    }
}

/// A publisher whose broker is always unreachable.
#[derive(Debug)]
pub struct FailingEventPublisher;

#[async_trait]
impl EventPublisher for FailingEventPublisher {
    async fn publish(
        &self,
        _event: &StoredEvent,
        _subject: &str,
        _correlation_id: Uuid,
    ) -> Result<(), DomainError> {
        Err(DomainError::Publish("broker unreachable".into()))
    }
}
