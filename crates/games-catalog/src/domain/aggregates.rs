//! Aggregate roots for the catalog context.

use games_core::aggregate::AggregateRoot;
use games_core::clock::Clock;
use games_core::error::DomainError;
use games_core::event::EventMetadata;
use uuid::Uuid;

use super::attributes::GameAttributes;
use super::events::{GameCreated, GameDeleted, GameEvent, GameEventKind, GameUpdated};

/// The aggregate root for a game.
#[derive(Debug)]
pub struct Game {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (number of events applied).
    pub(crate) version: i64,
    /// Current attributes; `None` before creation.
    attributes: Option<GameAttributes>,
    /// Set once a `GameDeleted` event has been applied.
    deleted: bool,
    /// Events recorded but not yet stored.
    pending_events: Vec<GameEvent>,
}

impl Game {
    /// Creates an empty, never-written game.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            attributes: None,
            deleted: false,
            pending_events: Vec::new(),
        }
    }

    /// Returns `true` when the game has been created and not deleted.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.attributes.is_some() && !self.deleted
    }

    /// Returns `true` once a `GameDeleted` event has been applied.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// The current attributes of a live game.
    #[must_use]
    pub fn attributes(&self) -> Option<&GameAttributes> {
        if self.deleted {
            None
        } else {
            self.attributes.as_ref()
        }
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.pending_events.len() as i64
    }

    fn record(&mut self, kind: GameEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = GameEvent {
            metadata: EventMetadata {
                event_id: Uuid::now_v7(),
                event_type: kind.subject().event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.pending_events.push(event);
    }

    /// Registers the game, producing a `GameCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateAggregate` if this aggregate already
    /// has history.
    pub fn create(
        &mut self,
        attributes: GameAttributes,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.version > 0 || !self.pending_events.is_empty() {
            return Err(DomainError::DuplicateAggregate(format!(
                "game {} already exists",
                self.id
            )));
        }
        let kind = GameEventKind::Created(GameCreated::new(self.id, attributes));
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Replaces the game's attributes, producing a `GameUpdated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the game is not live.
    pub fn update(
        &mut self,
        attributes: GameAttributes,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if !self.is_live() {
            return Err(DomainError::AggregateNotFound(self.id));
        }
        let kind = GameEventKind::Updated(GameUpdated::new(self.id, attributes));
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Removes the game, producing a `GameDeleted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the game is not live.
    pub fn delete(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        if !self.is_live() {
            return Err(DomainError::AggregateNotFound(self.id));
        }
        let kind = GameEventKind::Deleted(GameDeleted {
            aggregate_id: self.id,
        });
        self.record(kind, correlation_id, clock);
        Ok(())
    }
}

impl AggregateRoot for Game {
    type Event = GameEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            GameEventKind::Created(payload) => {
                self.attributes = Some(payload.attributes());
                self.deleted = false;
            }
            GameEventKind::Updated(payload) => {
                self.attributes = Some(payload.attributes());
            }
            GameEventKind::Deleted(_) => {
                self.deleted = true;
            }
        }
        self.version += 1;
    }

    fn pending_events(&self) -> &[Self::Event] {
        &self.pending_events
    }

    fn take_pending_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.pending_events)
    }
}
