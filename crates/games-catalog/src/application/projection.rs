//! Projection of bus messages onto the read store.
//!
//! Messages are dispatched through [`handler_for`], an exhaustive table from
//! [`GameEventSubject`] to handler function. Every handler is idempotent and
//! version-aware, so redelivery and reordering converge on the same rows.

use futures::future::BoxFuture;
use games_core::error::DomainError;
use games_core::message::{BusMessage, CONTENT_TYPE_JSON};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::read_store::{GameReadStore, GameRecord, InsertOutcome, UpdateOutcome};
use crate::domain::events::{GameEventKind, GameEventSubject};

/// What applying a message did to the read store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    /// The read store changed.
    Applied,
    /// The message had already been applied.
    AlreadyApplied,
    /// The read store already reflects a later event.
    Stale,
    /// An update arrived for a game with no row. Logged, not retried; the
    /// row heals on a later event or a rebuild.
    Gap,
    /// The change would give two games the same natural key.
    NaturalKeyConflict,
    /// The subject is not one this consumer knows.
    UnknownSubject,
}

/// What the consumer should do with a message after handling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge the message.
    Complete,
    /// Leave the message unacknowledged so the broker redelivers it.
    Redeliver,
}

/// Maps a handling result to a disposition. Handled messages and messages
/// that can never be decoded are completed; any other error is redelivered.
#[must_use]
pub fn disposition(result: &Result<ProjectionOutcome, DomainError>) -> Disposition {
    match result {
        Ok(_) | Err(DomainError::Deserialization(_)) => Disposition::Complete,
        Err(_) => Disposition::Redeliver,
    }
}

/// A future produced by a projection handler.
pub type ProjectionFuture<'a> = BoxFuture<'a, Result<ProjectionOutcome, DomainError>>;

/// A projection handler.
pub type ProjectionHandler =
    for<'a> fn(&'a DecodedEvent, &'a dyn GameReadStore) -> ProjectionFuture<'a>;

/// A message decoded into a typed event with its version.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    /// The event payload.
    pub kind: GameEventKind,
    /// Sequence number of the event in its stream.
    pub version: i64,
}

/// Returns the handler for a subject.
#[must_use]
pub fn handler_for(subject: GameEventSubject) -> ProjectionHandler {
    match subject {
        GameEventSubject::Created => project_created,
        GameEventSubject::Updated => project_updated,
        GameEventSubject::Deleted => project_deleted,
    }
}

/// Decodes a message body.
///
/// # Errors
///
/// Returns `DomainError::Deserialization` if the content type is not JSON,
/// the body does not match the subject, the version header is missing, or
/// the aggregate id header disagrees with the body.
pub fn decode(
    subject: GameEventSubject,
    message: &BusMessage,
) -> Result<DecodedEvent, DomainError> {
    if message.content_type != CONTENT_TYPE_JSON {
        return Err(DomainError::Deserialization(format!(
            "unsupported content type: {}",
            message.content_type
        )));
    }
    let payload: serde_json::Value = serde_json::from_slice(&message.body)
        .map_err(|e| DomainError::Deserialization(format!("body is not JSON: {e}")))?;
    let kind = GameEventKind::from_payload(subject.event_type(), &payload)?;
    if let Some(header_id) = message
        .aggregate_id
        .filter(|id| *id != kind.aggregate_id())
    {
        return Err(DomainError::Deserialization(format!(
            "aggregate id header {header_id} does not match body {}",
            kind.aggregate_id()
        )));
    }
    let version = message
        .version
        .ok_or_else(|| DomainError::Deserialization("message has no version".to_owned()))?;
    Ok(DecodedEvent { kind, version })
}

/// Applies one bus message to the read store.
///
/// # Errors
///
/// Returns `DomainError::Deserialization` for a message that cannot be
/// decoded, and any read store error unchanged.
pub async fn apply_message(
    message: &BusMessage,
    read_store: &dyn GameReadStore,
) -> Result<ProjectionOutcome, DomainError> {
    let Some(subject) = GameEventSubject::parse(&message.subject) else {
        warn!(
            subject = %message.subject,
            correlation_id = %message.correlation_id,
            "unknown subject; skipping"
        );
        return Ok(ProjectionOutcome::UnknownSubject);
    };
    let event = decode(subject, message)?;
    let outcome = handler_for(subject)(&event, read_store).await?;
    debug!(
        subject = subject.as_str(),
        aggregate_id = %event.kind.aggregate_id(),
        version = event.version,
        correlation_id = %message.correlation_id,
        ?outcome,
        "message projected"
    );
    Ok(outcome)
}

fn record_of(game_id: Uuid, event: &DecodedEvent) -> Option<GameRecord> {
    let attributes = match &event.kind {
        GameEventKind::Created(e) => e.attributes(),
        GameEventKind::Updated(e) => e.attributes(),
        GameEventKind::Deleted(_) => return None,
    };
    Some(GameRecord::from_attributes(game_id, &attributes, event.version))
}

fn mismatched(event: &DecodedEvent, expected: GameEventSubject) -> DomainError {
    DomainError::Deserialization(format!(
        "{} handler received {:?}",
        expected.as_str(),
        event.kind.subject()
    ))
}

fn project_created<'a>(
    event: &'a DecodedEvent,
    read_store: &'a dyn GameReadStore,
) -> ProjectionFuture<'a> {
    Box::pin(async move {
        let game_id = event.kind.aggregate_id();
        let record = match (&event.kind, record_of(game_id, event)) {
            (GameEventKind::Created(_), Some(record)) => record,
            _ => return Err(mismatched(event, GameEventSubject::Created)),
        };
        match read_store.insert_if_absent(&record).await? {
            InsertOutcome::Inserted => {
                info!(aggregate_id = %game_id, version = event.version, "game row inserted");
                Ok(ProjectionOutcome::Applied)
            }
            InsertOutcome::AlreadyPresent => Ok(ProjectionOutcome::AlreadyApplied),
            InsertOutcome::Tombstoned => Ok(ProjectionOutcome::Stale),
            InsertOutcome::NaturalKeyTaken => {
                warn!(
                    aggregate_id = %game_id,
                    key = %record.natural_key(),
                    "natural key already taken by another row; skipping insert"
                );
                Ok(ProjectionOutcome::NaturalKeyConflict)
            }
        }
    })
}

fn project_updated<'a>(
    event: &'a DecodedEvent,
    read_store: &'a dyn GameReadStore,
) -> ProjectionFuture<'a> {
    Box::pin(async move {
        let game_id = event.kind.aggregate_id();
        let record = match (&event.kind, record_of(game_id, event)) {
            (GameEventKind::Updated(_), Some(record)) => record,
            _ => return Err(mismatched(event, GameEventSubject::Updated)),
        };
        match read_store.update(&record).await? {
            UpdateOutcome::Applied => {
                info!(aggregate_id = %game_id, version = event.version, "game row updated");
                Ok(ProjectionOutcome::Applied)
            }
            UpdateOutcome::Stale => Ok(ProjectionOutcome::Stale),
            UpdateOutcome::Missing => {
                warn!(
                    aggregate_id = %game_id,
                    version = event.version,
                    "projection gap: update for a game with no row"
                );
                Ok(ProjectionOutcome::Gap)
            }
            UpdateOutcome::NaturalKeyConflict => {
                warn!(
                    aggregate_id = %game_id,
                    key = %record.natural_key(),
                    "natural key held by another row; skipping update"
                );
                Ok(ProjectionOutcome::NaturalKeyConflict)
            }
        }
    })
}

fn project_deleted<'a>(
    event: &'a DecodedEvent,
    read_store: &'a dyn GameReadStore,
) -> ProjectionFuture<'a> {
    Box::pin(async move {
        let GameEventKind::Deleted(deleted) = &event.kind else {
            return Err(mismatched(event, GameEventSubject::Deleted));
        };
        if read_store.remove(deleted.aggregate_id, event.version).await? {
            info!(aggregate_id = %deleted.aggregate_id, version = event.version, "game row removed");
            Ok(ProjectionOutcome::Applied)
        } else {
            Ok(ProjectionOutcome::AlreadyApplied)
        }
    })
}
