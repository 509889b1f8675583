//! Mapping between `BusMessage` metadata and NATS headers.

use async_nats::HeaderMap;
use chrono::{DateTime, Utc};
use games_core::error::DomainError;
use games_core::message::{BusMessage, CONTENT_TYPE_JSON};
use uuid::Uuid;

/// Event-type discriminator.
pub const SUBJECT: &str = "Subject";
/// End-to-end tracing token.
pub const CORRELATION_ID: &str = "Correlation-Id";
/// Body encoding.
pub const CONTENT_TYPE: &str = "Content-Type";
/// Stored event type.
pub const EVENT_NAME: &str = "Event-Name";
/// RFC 3339 timestamp assigned when the event was stored.
pub const OCCURRED_AT: &str = "Occurred-At";
/// Stored event identifier.
pub const EVENT_ID: &str = "Event-Id";
/// Aggregate the event belongs to.
pub const AGGREGATE_ID: &str = "Aggregate-Id";
/// Sequence number of the event in its stream.
pub const VERSION: &str = "Version";
/// JetStream de-duplication key.
pub const NATS_MSG_ID: &str = "Nats-Msg-Id";

/// Builds the headers for an outgoing message.
#[must_use]
pub fn encode_headers(message: &BusMessage) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(SUBJECT, message.subject.as_str());
    headers.insert(CORRELATION_ID, message.correlation_id.to_string().as_str());
    headers.insert(CONTENT_TYPE, message.content_type.as_str());
    headers.insert(EVENT_NAME, message.event_name.as_str());
    headers.insert(OCCURRED_AT, message.occurred_at.to_rfc3339().as_str());
    if let Some(event_id) = message.event_id {
        let event_id = event_id.to_string();
        headers.insert(EVENT_ID, event_id.as_str());
        headers.insert(NATS_MSG_ID, event_id.as_str());
    }
    if let Some(aggregate_id) = message.aggregate_id {
        headers.insert(AGGREGATE_ID, aggregate_id.to_string().as_str());
    }
    if let Some(version) = message.version {
        headers.insert(VERSION, version.to_string().as_str());
    }
    headers
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).map(|value| value.as_str())
}

fn required<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, DomainError> {
    header(headers, name)
        .ok_or_else(|| DomainError::Deserialization(format!("missing {name} header")))
}

fn parse_uuid(name: &str, value: &str) -> Result<Uuid, DomainError> {
    value
        .parse()
        .map_err(|e| DomainError::Deserialization(format!("invalid {name} header: {e}")))
}

fn optional_uuid(headers: &HeaderMap, name: &str) -> Result<Option<Uuid>, DomainError> {
    header(headers, name)
        .map(|value| parse_uuid(name, value))
        .transpose()
}

/// Rebuilds a `BusMessage` from an incoming message.
///
/// `Subject`, `Correlation-Id` and `Occurred-At` are required.
/// `Content-Type` defaults to JSON and `Event-Name` to the subject.
///
/// # Errors
///
/// Returns `DomainError::Deserialization` if a required header is missing
/// or any header is malformed.
pub fn decode_message(headers: Option<&HeaderMap>, body: &[u8]) -> Result<BusMessage, DomainError> {
    let headers =
        headers.ok_or_else(|| DomainError::Deserialization("message has no headers".into()))?;

    let subject = required(headers, SUBJECT)?.to_owned();
    let correlation_id = parse_uuid(CORRELATION_ID, required(headers, CORRELATION_ID)?)?;
    let occurred_at = DateTime::parse_from_rfc3339(required(headers, OCCURRED_AT)?)
        .map_err(|e| DomainError::Deserialization(format!("invalid {OCCURRED_AT} header: {e}")))?
        .with_timezone(&Utc);
    let version = header(headers, VERSION)
        .map(|value| {
            value.parse::<i64>().map_err(|e| {
                DomainError::Deserialization(format!("invalid {VERSION} header: {e}"))
            })
        })
        .transpose()?;

    Ok(BusMessage {
        content_type: header(headers, CONTENT_TYPE)
            .unwrap_or(CONTENT_TYPE_JSON)
            .to_owned(),
        event_name: header(headers, EVENT_NAME)
            .map_or_else(|| subject.clone(), str::to_owned),
        subject,
        correlation_id,
        occurred_at,
        event_id: optional_uuid(headers, EVENT_ID)?,
        aggregate_id: optional_uuid(headers, AGGREGATE_ID)?,
        version,
        body: body.to_vec(),
    })
}
