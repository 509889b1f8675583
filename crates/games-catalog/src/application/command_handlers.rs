//! Command handlers for the catalog context.
//!
//! Each handler runs one command against one game: validate, load the
//! stream, mutate the aggregate, append at the expected version, publish,
//! and answer with a locally projected view. The read store is only
//! consulted for the natural-key duplicate check.

use chrono::Datelike;
use games_core::aggregate::AggregateRoot;
use games_core::cancellation::CancellationSignal;
use games_core::clock::Clock;
use games_core::command::Command;
use games_core::error::DomainError;
use games_core::event::{DomainEvent, EventMetadata};
use games_core::publisher::EventPublisher;
use games_core::repository::{EventRepository, StoredEvent};
use games_core::version;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::query_handlers::GameView;
use crate::application::read_store::GameReadStore;
use crate::domain::aggregates::Game;
use crate::domain::attributes::GameAttributes;
use crate::domain::commands::{CreateGame, DeleteGame, RepublishGame, UpdateGame};
use crate::domain::events::{GameEvent, GameEventKind, GameEventSubject};

/// The collaborators a command handler needs, passed in by the caller.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    /// Source of event timestamps and the current year.
    pub clock: &'a dyn Clock,
    /// The event store.
    pub events: &'a dyn EventRepository,
    /// The bus publisher.
    pub publisher: &'a dyn EventPublisher,
    /// The read store, used for the natural-key duplicate check.
    pub read_store: &'a dyn GameReadStore,
    /// Checked once, immediately before the append.
    pub cancellation: &'a dyn CancellationSignal,
}

/// Whether the events of a command reached the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    /// Every event was accepted by the broker.
    Published,
    /// The events are stored but at least one was not published; the game
    /// must be republished for the read store to catch up.
    Failed {
        /// Why the publish failed.
        reason: String,
    },
}

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct GameCommandResult {
    /// The game affected by the command.
    pub game_id: Uuid,
    /// The game as projected locally from the command; `None` after a delete.
    pub game: Option<GameView>,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
    /// Outcome of the publish step.
    pub publish_status: PublishStatus,
}

fn to_stored_event(event: &GameEvent) -> Result<StoredEvent, DomainError> {
    let meta = event.metadata();
    Ok(StoredEvent {
        event_id: meta.event_id,
        aggregate_id: meta.aggregate_id,
        event_type: event.event_type().to_owned(),
        payload: event.to_payload()?,
        sequence_number: meta.sequence_number,
        correlation_id: meta.correlation_id,
        causation_id: meta.causation_id,
        occurred_at: meta.occurred_at,
    })
}

/// Reconstitutes a `Game` from its stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the stream is not numbered
/// 0..N or belongs to another aggregate, and
/// `DomainError::Deserialization` if a payload cannot be decoded.
pub(crate) fn reconstitute(
    game_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Game, DomainError> {
    version::ensure_contiguous(game_id, 0, existing_events)
        .map_err(|e| DomainError::Infrastructure(format!("corrupt event stream: {e}")))?;
    let mut game = Game::new(game_id);
    for stored in existing_events {
        let kind = GameEventKind::from_payload(&stored.event_type, &stored.payload)?;
        let event = GameEvent {
            metadata: EventMetadata {
                event_id: stored.event_id,
                event_type: stored.event_type.clone(),
                aggregate_id: stored.aggregate_id,
                sequence_number: stored.sequence_number,
                correlation_id: stored.correlation_id,
                causation_id: stored.causation_id,
                occurred_at: stored.occurred_at,
            },
            kind,
        };
        game.apply(&event);
    }
    Ok(game)
}

async fn load_live_game(
    game_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<(Game, Vec<StoredEvent>), DomainError> {
    let existing_events = repo.load_events(game_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(game_id));
    }
    let game = reconstitute(game_id, &existing_events)?;
    if !game.is_live() {
        return Err(DomainError::AggregateNotFound(game_id));
    }
    Ok((game, existing_events))
}

async fn ensure_natural_key_free(
    game_id: Uuid,
    attributes: &GameAttributes,
    read_store: &dyn GameReadStore,
) -> Result<(), DomainError> {
    let key = attributes.natural_key();
    match read_store.find_by_natural_key(&key).await? {
        Some(holder) if holder.game_id != game_id => Err(DomainError::DuplicateAggregate(
            format!("{key} already exists as game {}", holder.game_id),
        )),
        _ => Ok(()),
    }
}

/// Publishes stored events in order, stopping at the first failure.
async fn publish_events(
    publisher: &dyn EventPublisher,
    stored_events: &[StoredEvent],
) -> Result<(), DomainError> {
    for event in stored_events {
        let subject = GameEventSubject::parse(&event.event_type).ok_or_else(|| {
            DomainError::Publish(format!("no bus subject for {}", event.event_type))
        })?;
        publisher
            .publish(event, subject.as_str(), event.correlation_id)
            .await?;
    }
    Ok(())
}

/// Appends the aggregate's pending events at `expected_version`, then
/// publishes them.
///
/// Cancellation is honoured only before the append. Once the events are
/// stored the publish always runs; a failure is reported in the result
/// rather than as an error, since the command itself has taken effect.
async fn commit(
    ctx: CommandContext<'_>,
    mut game: Game,
    expected_version: i64,
) -> Result<GameCommandResult, DomainError> {
    let stored_events = game
        .pending_events()
        .iter()
        .map(to_stored_event)
        .collect::<Result<Vec<_>, _>>()?;

    if ctx.cancellation.is_cancelled() {
        return Err(DomainError::Cancelled);
    }
    ctx.events
        .append_events(game.id, expected_version, &stored_events)
        .await?;

    game.mark_committed();

    let publish_status = match publish_events(ctx.publisher, &stored_events).await {
        Ok(()) => PublishStatus::Published,
        Err(e) => {
            warn!(
                aggregate_id = %game.id,
                version = game.last_sequence_number(),
                error = %e,
                "event stored but not published; republish required"
            );
            PublishStatus::Failed {
                reason: e.to_string(),
            }
        }
    };

    for event in &stored_events {
        info!(
            aggregate_id = %event.aggregate_id,
            event_id = %event.event_id,
            event_type = %event.event_type,
            version = event.sequence_number,
            correlation_id = %event.correlation_id,
            "event stored"
        );
    }

    Ok(GameCommandResult {
        game_id: game.id,
        game: GameView::from_game(&game),
        stored_events,
        publish_status,
    })
}

fn log_received(command: &dyn Command) {
    debug!(
        command_type = command.command_type(),
        aggregate_id = %command.aggregate_id(),
        correlation_id = %command.correlation_id(),
        "handling command"
    );
}

/// Handles the `CreateGame` command: validates the attributes, checks the
/// natural key, and stores a `GameCreated` event at version 0.
///
/// # Errors
///
/// Returns `DomainError::Validation` for invalid attributes,
/// `DomainError::DuplicateAggregate` if the natural key or the ID is taken,
/// `DomainError::ConcurrencyConflict` if another writer created the game
/// first, and `DomainError::Cancelled` if cancelled before the append.
pub async fn handle_create_game(
    command: &CreateGame,
    ctx: CommandContext<'_>,
) -> Result<GameCommandResult, DomainError> {
    log_received(command);
    let attributes = command.attributes.normalized();
    attributes.validate(ctx.clock.now().year())?;
    ensure_natural_key_free(command.game_id, &attributes, ctx.read_store).await?;

    let existing_events = ctx.events.load_events(command.game_id).await?;
    let mut game = reconstitute(command.game_id, &existing_events)?;
    game.create(attributes, command.correlation_id, ctx.clock)?;

    commit(ctx, game, version::expected_version(&existing_events)).await
}

/// Handles the `UpdateGame` command: merges the changes into the current
/// attributes, validates the result, and stores a `GameUpdated` event
/// carrying the full attribute set.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the game does not exist or
/// was deleted, `DomainError::Validation` for an empty change set or invalid
/// result, `DomainError::DuplicateAggregate` if the new natural key belongs
/// to another game, and `DomainError::ConcurrencyConflict` on a lost race.
pub async fn handle_update_game(
    command: &UpdateGame,
    ctx: CommandContext<'_>,
) -> Result<GameCommandResult, DomainError> {
    log_received(command);
    if command.changes.is_empty() {
        return Err(DomainError::Validation(
            "at least one attribute must be changed".to_owned(),
        ));
    }
    let (mut game, existing_events) = load_live_game(command.game_id, ctx.events).await?;
    let current = game
        .attributes()
        .ok_or(DomainError::AggregateNotFound(command.game_id))?;
    let attributes = command.changes.apply_to(current).normalized();
    attributes.validate(ctx.clock.now().year())?;
    ensure_natural_key_free(command.game_id, &attributes, ctx.read_store).await?;

    game.update(attributes, command.correlation_id, ctx.clock)?;

    commit(ctx, game, version::expected_version(&existing_events)).await
}

/// Handles the `DeleteGame` command: stores a `GameDeleted` event.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the game does not exist or
/// was already deleted, and `DomainError::ConcurrencyConflict` on a lost
/// race.
pub async fn handle_delete_game(
    command: &DeleteGame,
    ctx: CommandContext<'_>,
) -> Result<GameCommandResult, DomainError> {
    log_received(command);
    let (mut game, existing_events) = load_live_game(command.game_id, ctx.events).await?;

    game.delete(command.correlation_id, ctx.clock)?;

    commit(ctx, game, version::expected_version(&existing_events)).await
}

/// Handles the `RepublishGame` command: publishes every stored event of the
/// game again, in version order, under its original correlation id.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID,
/// and `DomainError::Publish` if the broker rejects an event.
pub async fn handle_republish_game(
    command: &RepublishGame,
    ctx: CommandContext<'_>,
) -> Result<Vec<StoredEvent>, DomainError> {
    log_received(command);
    let stored_events = ctx.events.load_events(command.game_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(command.game_id));
    }
    publish_events(ctx.publisher, &stored_events).await?;
    info!(
        aggregate_id = %command.game_id,
        correlation_id = %command.correlation_id,
        events = stored_events.len(),
        "game republished"
    );
    Ok(stored_events)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use games_core::cancellation::NeverCancelled;
    use games_core::error::DomainError;
    use games_core::message::BusMessage;
    use games_core::repository::{EventRepository, StoredEvent};
    use games_test_support::{
        AlreadyCancelled, EmptyEventRepository, FailingEventPublisher, FailingEventRepository,
        FixedClock, InMemoryEventRepository, RecordingEventPublisher, RecordingEventRepository,
    };
    use uuid::Uuid;

    use super::*;
    use crate::application::projection::apply_message;
    use crate::application::read_store::{GameRecord, InMemoryGameReadStore};
    use crate::domain::attributes::GameChanges;
    use crate::domain::events::{
        GAME_CREATED_EVENT_TYPE, GAME_DELETED_EVENT_TYPE, GAME_UPDATED_EVENT_TYPE,
    };
    use crate::domain::genre::Genre;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn chrono_trigger() -> GameAttributes {
        GameAttributes {
            title: "Chrono Trigger".to_owned(),
            price: 19.99,
            launch_year: 1995,
            developer: "Square".to_owned(),
            genre: Genre::Rpg,
        }
    }

    fn ctx<'a>(
        clock: &'a FixedClock,
        events: &'a dyn EventRepository,
        publisher: &'a dyn EventPublisher,
        read_store: &'a dyn GameReadStore,
    ) -> CommandContext<'a> {
        CommandContext {
            clock,
            events,
            publisher,
            read_store,
            cancellation: &NeverCancelled,
        }
    }

    fn create_command(game_id: Uuid) -> CreateGame {
        CreateGame {
            correlation_id: Uuid::new_v4(),
            game_id,
            attributes: chrono_trigger(),
        }
    }

    fn price_change(game_id: Uuid, price: f64) -> UpdateGame {
        UpdateGame {
            correlation_id: Uuid::new_v4(),
            game_id,
            changes: GameChanges {
                price: Some(price),
                ..GameChanges::default()
            },
        }
    }

    async fn project_all(messages: &[BusMessage], store: &InMemoryGameReadStore) {
        for message in messages {
            apply_message(message, store).await.unwrap();
        }
    }

    /// Serves loads from a snapshot taken before any append, so two
    /// sequential commands behave like two concurrent ones that read the
    /// same version.
    struct StaleReadRepository {
        inner: InMemoryEventRepository,
        snapshot: Mutex<Option<Vec<StoredEvent>>>,
    }

    #[async_trait]
    impl EventRepository for StaleReadRepository {
        async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
            let snapshot = self.snapshot.lock().unwrap().clone();
            match snapshot {
                Some(events) => Ok(events),
                None => {
                    let events = self.inner.load_events(aggregate_id).await?;
                    *self.snapshot.lock().unwrap() = Some(events.clone());
                    Ok(events)
                }
            }
        }

        async fn append_events(
            &self,
            aggregate_id: Uuid,
            expected_version: i64,
            events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            self.inner
                .append_events(aggregate_id, expected_version, events)
                .await
        }

        async fn aggregate_ids(&self) -> Result<Vec<Uuid>, DomainError> {
            self.inner.aggregate_ids().await
        }
    }

    #[tokio::test]
    async fn test_create_game_appends_one_event_at_version_zero_and_publishes_it() {
        // Arrange
        let clock = clock();
        let game_id = Uuid::new_v4();
        let command = create_command(game_id);
        let repo = InMemoryEventRepository::new();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();

        // Act
        let result = handle_create_game(&command, ctx(&clock, &repo, &publisher, &read_store))
            .await
            .unwrap();

        // Assert
        let stored = repo.load_events(game_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sequence_number, 0);
        assert_eq!(stored[0].event_type, GAME_CREATED_EVENT_TYPE);
        assert_eq!(stored[0].correlation_id, command.correlation_id);
        assert_eq!(stored[0].occurred_at, clock.0);

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].subject, "Created");
        assert_eq!(published[0].correlation_id, command.correlation_id);
        assert_eq!(published[0].event_id, Some(stored[0].event_id));

        assert_eq!(result.publish_status, PublishStatus::Published);
        assert_eq!(result.stored_events, stored);
        let view = result.game.unwrap();
        assert_eq!(view.game_id, game_id);
        assert_eq!(view.title, "Chrono Trigger");
        assert_eq!(view.version, 0);
    }

    #[tokio::test]
    async fn test_chrono_trigger_flows_from_command_to_read_model() {
        // Arrange
        let clock = clock();
        let game_id = Uuid::new_v4();
        let repo = InMemoryEventRepository::new();
        let publisher = RecordingEventPublisher::new();
        let write_side = InMemoryGameReadStore::new();
        let projection = InMemoryGameReadStore::new();

        // Act
        handle_create_game(
            &create_command(game_id),
            ctx(&clock, &repo, &publisher, &write_side),
        )
        .await
        .unwrap();
        project_all(&publisher.published(), &projection).await;

        // Assert
        assert_eq!(repo.all_events().len(), 1);
        assert_eq!(publisher.published().len(), 1);
        let rows = projection.list().await.unwrap();
        assert_eq!(
            rows,
            vec![GameRecord::from_attributes(game_id, &chrono_trigger(), 0)]
        );
    }

    #[tokio::test]
    async fn test_create_game_rejects_invalid_attributes_without_appending() {
        // Arrange
        let clock = clock();
        let mut command = create_command(Uuid::new_v4());
        command.attributes.title = "  ".to_owned();
        command.attributes.price = -5.0;
        let repo = RecordingEventRepository::new(vec![]);
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();

        // Act
        let result =
            handle_create_game(&command, ctx(&clock, &repo, &publisher, &read_store)).await;

        // Assert
        match result {
            Err(DomainError::Validation(msg)) => {
                assert!(msg.contains("title must not be empty"));
                assert!(msg.contains("price must be a non-negative amount"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(repo.appended_events().is_empty());
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_create_game_rejects_taken_natural_key() {
        // Arrange
        let clock = clock();
        let read_store = InMemoryGameReadStore::new();
        let existing_id = Uuid::new_v4();
        read_store
            .insert_if_absent(&GameRecord::from_attributes(
                existing_id,
                &chrono_trigger(),
                0,
            ))
            .await
            .unwrap();
        let mut command = create_command(Uuid::new_v4());
        command.attributes.title = "  Chrono Trigger ".to_owned();
        let repo = RecordingEventRepository::new(vec![]);
        let publisher = RecordingEventPublisher::new();

        // Act
        let result =
            handle_create_game(&command, ctx(&clock, &repo, &publisher, &read_store)).await;

        // Assert
        match result {
            Err(DomainError::DuplicateAggregate(msg)) => {
                assert!(msg.contains(&existing_id.to_string()));
            }
            other => panic!("expected DuplicateAggregate, got {other:?}"),
        }
        assert!(repo.appended_events().is_empty());
    }

    #[tokio::test]
    async fn test_create_game_with_existing_id_is_duplicate() {
        let clock = clock();
        let game_id = Uuid::new_v4();
        let repo = InMemoryEventRepository::new();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        handle_create_game(
            &create_command(game_id),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await
        .unwrap();

        let mut again = create_command(game_id);
        again.attributes.title = "Chrono Cross".to_owned();
        let result = handle_create_game(&again, ctx(&clock, &repo, &publisher, &read_store)).await;

        assert!(matches!(result, Err(DomainError::DuplicateAggregate(_))));
        assert_eq!(repo.all_events().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_create_does_not_append() {
        // Arrange
        let clock = clock();
        let repo = RecordingEventRepository::new(vec![]);
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        let context = CommandContext {
            cancellation: &AlreadyCancelled,
            ..ctx(&clock, &repo, &publisher, &read_store)
        };

        // Act
        let result = handle_create_game(&create_command(Uuid::new_v4()), context).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Cancelled)));
        assert!(repo.appended_events().is_empty());
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_after_append_is_reported_not_raised() {
        // Arrange
        let clock = clock();
        let game_id = Uuid::new_v4();
        let repo = InMemoryEventRepository::new();
        let read_store = InMemoryGameReadStore::new();

        // Act
        let result = handle_create_game(
            &create_command(game_id),
            ctx(&clock, &repo, &FailingEventPublisher, &read_store),
        )
        .await
        .unwrap();

        // Assert
        match &result.publish_status {
            PublishStatus::Failed { reason } => assert!(reason.contains("broker unreachable")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(repo.load_events(game_id).await.unwrap().len(), 1);
        assert!(result.game.is_some());
    }

    #[tokio::test]
    async fn test_update_at_version_two_is_stored_at_version_two() {
        // Arrange
        let clock = clock();
        let game_id = Uuid::new_v4();
        let repo = InMemoryEventRepository::new();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        handle_create_game(
            &create_command(game_id),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await
        .unwrap();
        handle_update_game(
            &price_change(game_id, 14.99),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await
        .unwrap();
        assert_eq!(repo.load_events(game_id).await.unwrap().len(), 2);

        // Act
        let command = price_change(game_id, 9.99);
        let result = handle_update_game(&command, ctx(&clock, &repo, &publisher, &read_store))
            .await
            .unwrap();

        // Assert
        let stored = repo.load_events(game_id).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2].sequence_number, 2);
        assert_eq!(stored[2].event_type, GAME_UPDATED_EVENT_TYPE);
        assert_eq!(stored[2].correlation_id, command.correlation_id);
        assert_eq!(result.game.as_ref().map(|g| g.version), Some(2));

        let projection = InMemoryGameReadStore::new();
        project_all(&publisher.published(), &projection).await;
        let row = projection.find_by_id(game_id).await.unwrap().unwrap();
        assert!((row.price - 9.99).abs() < f64::EPSILON);
        assert_eq!(row.title, "Chrono Trigger");
        assert_eq!(row.version, 2);
    }

    #[tokio::test]
    async fn test_update_event_carries_full_attributes() {
        let clock = clock();
        let game_id = Uuid::new_v4();
        let repo = InMemoryEventRepository::new();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        handle_create_game(
            &create_command(game_id),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await
        .unwrap();

        let result = handle_update_game(
            &price_change(game_id, 9.99),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await
        .unwrap();

        let payload = &result.stored_events[0].payload;
        assert_eq!(payload["title"], "Chrono Trigger");
        assert_eq!(payload["developer"], "Square");
        assert_eq!(payload["launchYear"], 1995);
        assert_eq!(payload["genre"], "RPG");
        assert_eq!(payload["price"], 9.99);
    }

    #[tokio::test]
    async fn test_racing_updates_yield_exactly_one_conflict() {
        // Arrange
        let clock = clock();
        let game_id = Uuid::new_v4();
        let inner = InMemoryEventRepository::new();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        handle_create_game(
            &create_command(game_id),
            ctx(&clock, &inner, &publisher, &read_store),
        )
        .await
        .unwrap();
        let repo = StaleReadRepository {
            inner,
            snapshot: Mutex::new(None),
        };

        // Act
        let first = handle_update_game(
            &price_change(game_id, 9.99),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await;
        let second = handle_update_game(
            &price_change(game_id, 4.99),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await;

        // Assert
        assert!(first.is_ok());
        match second {
            Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            }) => {
                assert_eq!(aggregate_id, game_id);
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        assert_eq!(repo.inner.load_events(game_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_of_unknown_game_is_not_found() {
        let clock = clock();
        let game_id = Uuid::new_v4();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();

        let result = handle_update_game(
            &price_change(game_id, 9.99),
            ctx(&clock, &EmptyEventRepository, &publisher, &read_store),
        )
        .await;

        match result {
            Err(DomainError::AggregateNotFound(id)) => assert_eq!(id, game_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_with_no_changes_is_rejected() {
        let clock = clock();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        let command = UpdateGame {
            correlation_id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
            changes: GameChanges::default(),
        };

        let result = handle_update_game(
            &command,
            ctx(&clock, &EmptyEventRepository, &publisher, &read_store),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_onto_another_games_natural_key_is_duplicate() {
        // Arrange
        let clock = clock();
        let repo = InMemoryEventRepository::new();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        let chrono_id = Uuid::new_v4();
        let mana_id = Uuid::new_v4();
        let chrono = handle_create_game(
            &create_command(chrono_id),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await
        .unwrap();
        read_store
            .insert_if_absent(&GameRecord::from_attributes(
                chrono_id,
                &chrono_trigger(),
                chrono.stored_events[0].sequence_number,
            ))
            .await
            .unwrap();
        let mut mana = create_command(mana_id);
        mana.attributes.title = "Secret of Mana".to_owned();
        handle_create_game(&mana, ctx(&clock, &repo, &publisher, &read_store))
            .await
            .unwrap();

        // Act
        let command = UpdateGame {
            correlation_id: Uuid::new_v4(),
            game_id: mana_id,
            changes: GameChanges {
                title: Some("Chrono Trigger".to_owned()),
                ..GameChanges::default()
            },
        };
        let result = handle_update_game(&command, ctx(&clock, &repo, &publisher, &read_store)).await;

        // Assert
        assert!(matches!(result, Err(DomainError::DuplicateAggregate(_))));
        assert_eq!(repo.load_events(mana_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_game_appends_deleted_event_and_publishes() {
        // Arrange
        let clock = clock();
        let game_id = Uuid::new_v4();
        let repo = InMemoryEventRepository::new();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        handle_create_game(
            &create_command(game_id),
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await
        .unwrap();
        let command = DeleteGame {
            correlation_id: Uuid::new_v4(),
            game_id,
        };

        // Act
        let result = handle_delete_game(&command, ctx(&clock, &repo, &publisher, &read_store))
            .await
            .unwrap();

        // Assert
        assert!(result.game.is_none());
        assert_eq!(result.stored_events.len(), 1);
        assert_eq!(result.stored_events[0].event_type, GAME_DELETED_EVENT_TYPE);
        assert_eq!(result.stored_events[0].sequence_number, 1);
        let published = publisher.published();
        assert_eq!(published.last().map(|m| m.subject.as_str()), Some("Deleted"));

        let again = handle_delete_game(&command, ctx(&clock, &repo, &publisher, &read_store)).await;
        assert!(matches!(again, Err(DomainError::AggregateNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_propagates_store_failure() {
        let clock = clock();
        let publisher = RecordingEventPublisher::new();
        let read_store = InMemoryGameReadStore::new();
        let command = DeleteGame {
            correlation_id: Uuid::new_v4(),
            game_id: Uuid::new_v4(),
        };

        let result = handle_delete_game(
            &command,
            ctx(&clock, &FailingEventRepository, &publisher, &read_store),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_republish_sends_every_event_with_original_correlation() {
        // Arrange
        let clock = clock();
        let game_id = Uuid::new_v4();
        let repo = InMemoryEventRepository::new();
        let read_store = InMemoryGameReadStore::new();
        let create = create_command(game_id);
        handle_create_game(&create, ctx(&clock, &repo, &FailingEventPublisher, &read_store))
            .await
            .unwrap();
        let update = price_change(game_id, 9.99);
        handle_update_game(&update, ctx(&clock, &repo, &FailingEventPublisher, &read_store))
            .await
            .unwrap();
        let publisher = RecordingEventPublisher::new();

        // Act
        let republished = handle_republish_game(
            &RepublishGame {
                correlation_id: Uuid::new_v4(),
                game_id,
            },
            ctx(&clock, &repo, &publisher, &read_store),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(republished.len(), 2);
        let published = publisher.published();
        let subjects: Vec<&str> = published.iter().map(|m| m.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Created", "Updated"]);
        assert_eq!(published[0].correlation_id, create.correlation_id);
        assert_eq!(published[1].correlation_id, update.correlation_id);
    }

    #[tokio::test]
    async fn test_republish_surfaces_publish_failure() {
        let clock = clock();
        let game_id = Uuid::new_v4();
        let repo = InMemoryEventRepository::new();
        let read_store = InMemoryGameReadStore::new();
        handle_create_game(
            &create_command(game_id),
            ctx(&clock, &repo, &FailingEventPublisher, &read_store),
        )
        .await
        .unwrap();

        let result = handle_republish_game(
            &RepublishGame {
                correlation_id: Uuid::new_v4(),
                game_id,
            },
            ctx(&clock, &repo, &FailingEventPublisher, &read_store),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Publish(_))));
    }

    #[test]
    fn test_reconstitute_rejects_gapped_stream() {
        let game_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let event = StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: game_id,
            event_type: GAME_CREATED_EVENT_TYPE.to_owned(),
            payload: GameEventKind::Created(crate::domain::events::GameCreated::new(
                game_id,
                chrono_trigger(),
            ))
            .to_payload()
            .unwrap(),
            sequence_number: 1,
            correlation_id,
            causation_id: correlation_id,
            occurred_at: Utc::now(),
        };

        let result = reconstitute(game_id, &[event]);

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
