//! Version arithmetic for optimistic concurrency.
//!
//! Versions are zero-based. An aggregate with `N` stored events is at
//! version `N`, and the next event it produces is stored at sequence `N`.

use uuid::Uuid;

use crate::error::DomainError;
use crate::repository::StoredEvent;

/// Returns the version a writer must present when appending after
/// `existing`: the count of events already stored.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn expected_version(existing: &[StoredEvent]) -> i64 {
    existing.len() as i64
}

/// Rejects an append when the stream's current version differs from the
/// writer's expectation.
///
/// # Errors
///
/// Returns `DomainError::ConcurrencyConflict` when `actual != expected`.
pub fn ensure_expected_version(
    aggregate_id: Uuid,
    expected: i64,
    actual: i64,
) -> Result<(), DomainError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            expected,
            actual,
        })
    }
}

/// Checks that a batch belongs to `aggregate_id` and is numbered
/// `expected, expected + 1, ...`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if any event is misnumbered or belongs
/// to another aggregate.
#[allow(clippy::cast_possible_wrap)]
pub fn ensure_contiguous(
    aggregate_id: Uuid,
    expected: i64,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    for (offset, event) in events.iter().enumerate() {
        if event.aggregate_id != aggregate_id {
            return Err(DomainError::Validation(format!(
                "event {} belongs to aggregate {}, not {aggregate_id}",
                event.event_id, event.aggregate_id
            )));
        }
        let wanted = expected + offset as i64;
        if event.sequence_number != wanted {
            return Err(DomainError::Validation(format!(
                "event {} has sequence number {}, expected {wanted}",
                event.event_id, event.sequence_number
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn stored(aggregate_id: Uuid, sequence_number: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id,
            event_type: "GameCreated".to_owned(),
            payload: serde_json::json!({}),
            sequence_number,
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_expected_version_of_empty_stream_is_zero() {
        assert_eq!(expected_version(&[]), 0);
    }

    #[test]
    fn test_expected_version_is_event_count() {
        let id = Uuid::new_v4();
        let events = vec![stored(id, 0), stored(id, 1)];

        assert_eq!(expected_version(&events), 2);
    }

    #[test]
    fn test_ensure_expected_version_accepts_match() {
        assert!(ensure_expected_version(Uuid::new_v4(), 3, 3).is_ok());
    }

    #[test]
    fn test_ensure_expected_version_reports_both_versions() {
        let id = Uuid::new_v4();

        match ensure_expected_version(id, 2, 3) {
            Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            }) => {
                assert_eq!(aggregate_id, id);
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
    }

    #[test]
    fn test_ensure_contiguous_accepts_batch_starting_at_expected() {
        let id = Uuid::new_v4();
        let events = vec![stored(id, 2), stored(id, 3)];

        assert!(ensure_contiguous(id, 2, &events).is_ok());
    }

    #[test]
    fn test_ensure_contiguous_rejects_off_by_one_start() {
        let id = Uuid::new_v4();
        let events = vec![stored(id, 3)];

        let result = ensure_contiguous(id, 2, &events);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_ensure_contiguous_rejects_foreign_aggregate() {
        let id = Uuid::new_v4();
        let events = vec![stored(Uuid::new_v4(), 0)];

        let result = ensure_contiguous(id, 0, &events);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
