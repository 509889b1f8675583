//! NATS JetStream transport for the games service.
//!
//! Bus metadata travels in NATS headers so subscribers can route and filter
//! without reading the body. Each event is published on
//! `{topic}.{subject}` into a stream bound to `{topic}.>`.

pub mod headers;
pub mod publisher;
pub mod settings;
pub mod subscription;

use async_nats::jetstream;
use games_core::error::DomainError;
use tracing::info;

use crate::settings::BusSettings;

/// Connects to the broker and returns a JetStream context.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the server cannot be reached.
pub async fn connect(settings: &BusSettings) -> Result<jetstream::Context, DomainError> {
    let client = async_nats::connect(settings.url.as_str())
        .await
        .map_err(|e| DomainError::Infrastructure(format!("bus connect failed: {e}")))?;
    info!(url = %settings.url, "connected to NATS");
    Ok(jetstream::new(client))
}
