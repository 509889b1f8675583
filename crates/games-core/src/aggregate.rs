//! Event-sourced aggregate contract.
//!
//! A version counts applied events: a fresh aggregate is at version 0, and
//! an aggregate at version N stores its next event at sequence number N.

use uuid::Uuid;

use crate::event::DomainEvent;

/// An aggregate rebuilt by folding its event log.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate records and folds.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Number of stored events folded into the state.
    fn version(&self) -> i64;

    /// Folds one stored event into the state.
    fn apply(&mut self, event: &Self::Event);

    /// Events recorded by command methods and not yet stored.
    fn pending_events(&self) -> &[Self::Event];

    /// Removes and returns the pending events.
    fn take_pending_events(&mut self) -> Vec<Self::Event>;

    /// Sequence number of the last folded event; `None` for a fresh aggregate.
    fn last_sequence_number(&self) -> Option<i64> {
        let version = self.version();
        (version > 0).then_some(version - 1)
    }

    /// Folds the pending events once the store has accepted them.
    fn mark_committed(&mut self) {
        for event in self.take_pending_events() {
            self.apply(&event);
        }
    }
}
