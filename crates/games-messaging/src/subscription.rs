//! Durable pull subscription delivering decoded messages.

use std::time::Duration;

use async_nats::jetstream::{self, consumer::AckPolicy, consumer::pull, stream};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use games_core::error::DomainError;
use games_core::message::{BusMessage, InboundDelivery};
use tracing::{info, warn};

use crate::headers::decode_message;
use crate::settings::{BusSettings, SubscriptionSettings};

/// Window in which the broker drops republished events with a known id.
pub const DUPLICATE_WINDOW: Duration = Duration::from_secs(120);

fn bus_error(context: &str, err: impl std::fmt::Display) -> DomainError {
    DomainError::Infrastructure(format!("{context}: {err}"))
}

/// Creates the events stream if it does not exist yet.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the broker refuses.
pub async fn ensure_stream(
    context: &jetstream::Context,
    bus: &BusSettings,
) -> Result<stream::Stream, DomainError> {
    let stream = context
        .get_or_create_stream(stream::Config {
            name: bus.stream.clone(),
            subjects: vec![bus.stream_subjects()],
            duplicate_window: DUPLICATE_WINDOW,
            ..Default::default()
        })
        .await
        .map_err(|e| bus_error("stream setup failed", e))?;
    info!(stream = %bus.stream, subjects = %bus.stream_subjects(), "stream ready");
    Ok(stream)
}

/// A message received through a JetStream pull consumer.
pub struct JetStreamDelivery {
    message: BusMessage,
    raw: jetstream::Message,
}

#[async_trait]
impl InboundDelivery for JetStreamDelivery {
    fn message(&self) -> &BusMessage {
        &self.message
    }

    fn delivery_attempt(&self) -> u64 {
        self.raw
            .info()
            .ok()
            .and_then(|info| u64::try_from(info.delivered).ok())
            .unwrap_or(1)
    }

    async fn complete(&self) -> Result<(), DomainError> {
        self.raw
            .ack()
            .await
            .map_err(|e| bus_error("acknowledgement failed", e))
    }
}

/// Binds the durable consumer and returns its message stream.
///
/// Messages whose headers cannot be decoded are acknowledged and dropped
/// here, since redelivering them cannot succeed.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the stream or consumer cannot be
/// set up.
pub async fn subscribe(
    context: &jetstream::Context,
    bus: &BusSettings,
    subscription: &SubscriptionSettings,
) -> Result<impl Stream<Item = Result<JetStreamDelivery, DomainError>> + Send + use<>, DomainError>
{
    let stream = ensure_stream(context, bus).await?;
    let consumer = stream
        .get_or_create_consumer(
            &subscription.name,
            pull::Config {
                durable_name: Some(subscription.name.clone()),
                ack_policy: AckPolicy::Explicit,
                ack_wait: subscription.ack_wait,
                max_deliver: i64::from(subscription.max_deliver),
                max_ack_pending: i64::from(subscription.prefetch),
                filter_subject: bus.stream_subjects(),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| bus_error("consumer setup failed", e))?;
    let messages = consumer
        .messages()
        .await
        .map_err(|e| bus_error("subscription failed", e))?;
    info!(
        subscription = %subscription.name,
        prefetch = subscription.prefetch,
        "subscribed"
    );

    Ok(messages.filter_map(|item| async move {
        let raw = match item {
            Ok(raw) => raw,
            Err(e) => return Some(Err(bus_error("receive failed", e))),
        };
        match decode_message(raw.message.headers.as_ref(), &raw.message.payload) {
            Ok(message) => Some(Ok(JetStreamDelivery { message, raw })),
            Err(e) => {
                warn!(
                    nats_subject = %raw.message.subject,
                    error = %e,
                    "undecodable message; acknowledging without processing"
                );
                if let Err(ack_err) = raw.ack().await {
                    warn!(error = %ack_err, "failed to acknowledge undecodable message");
                }
                None
            }
        }
    }))
}
