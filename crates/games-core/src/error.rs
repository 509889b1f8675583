//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A live aggregate already owns the natural key.
    #[error("duplicate aggregate: {0}")]
    DuplicateAggregate(String),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The message bus rejected or never received a message.
    #[error("publish failure: {0}")]
    Publish(String),

    /// A stored event or bus message could not be decoded.
    #[error("deserialization failure: {0}")]
    Deserialization(String),

    /// The operation was cancelled before anything was persisted.
    #[error("operation cancelled before the event was stored")]
    Cancelled,

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
