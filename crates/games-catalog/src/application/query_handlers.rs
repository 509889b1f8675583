//! Query handlers for the catalog context.
//!
//! Game state is served from the read store, so it reflects the projection
//! and may lag the event log. The history view reads the event log itself.

use chrono::{DateTime, Utc};
use games_core::aggregate::AggregateRoot;
use games_core::error::DomainError;
use games_core::repository::{EventRepository, StoredEvent};
use serde::Serialize;
use uuid::Uuid;

use crate::application::read_store::{GameReadStore, GameRecord};
use crate::domain::aggregates::Game;
use crate::domain::genre::Genre;

/// Read-only view of a game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameView {
    /// The game identifier.
    pub game_id: Uuid,
    /// Title.
    pub title: String,
    /// Price.
    pub price: f64,
    /// Launch year.
    pub launch_year: i32,
    /// Developer.
    pub developer: String,
    /// Genre.
    pub genre: Genre,
    /// Sequence number of the last event reflected in this view.
    pub version: i64,
}

impl From<GameRecord> for GameView {
    fn from(record: GameRecord) -> Self {
        Self {
            game_id: record.game_id,
            title: record.title,
            price: record.price,
            launch_year: record.launch_year,
            developer: record.developer,
            genre: record.genre,
            version: record.version,
        }
    }
}

impl GameView {
    /// Projects a live aggregate locally. Returns `None` for a game that
    /// was never created or has been deleted.
    #[must_use]
    pub fn from_game(game: &Game) -> Option<Self> {
        let attributes = game.attributes()?;
        Some(Self {
            game_id: game.id,
            title: attributes.title.clone(),
            price: attributes.price,
            launch_year: attributes.launch_year,
            developer: attributes.developer.clone(),
            genre: attributes.genre,
            version: game.last_sequence_number()?,
        })
    }
}

/// One entry of a game's event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventLogEntryView {
    /// The event identifier.
    pub event_id: Uuid,
    /// Stored event type.
    pub event_type: String,
    /// Sequence number within the game's stream.
    pub version: i64,
    /// Correlation id of the command that produced the event.
    pub correlation_id: Uuid,
    /// Server-assigned timestamp.
    pub occurred_at: DateTime<Utc>,
    /// Event payload.
    pub payload: serde_json::Value,
}

impl From<StoredEvent> for EventLogEntryView {
    fn from(event: StoredEvent) -> Self {
        Self {
            event_id: event.event_id,
            event_type: event.event_type,
            version: event.sequence_number,
            correlation_id: event.correlation_id,
            occurred_at: event.occurred_at,
            payload: event.payload,
        }
    }
}

/// Retrieves a game from the read store.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the read store has no row for
/// the ID.
pub async fn get_game_by_id(
    game_id: Uuid,
    read_store: &dyn GameReadStore,
) -> Result<GameView, DomainError> {
    read_store
        .find_by_id(game_id)
        .await?
        .map(GameView::from)
        .ok_or(DomainError::AggregateNotFound(game_id))
}

/// Lists every game in the read store.
///
/// # Errors
///
/// Returns `DomainError` if the read store cannot be queried.
pub async fn list_games(read_store: &dyn GameReadStore) -> Result<Vec<GameView>, DomainError> {
    Ok(read_store
        .list()
        .await?
        .into_iter()
        .map(GameView::from)
        .collect())
}

/// Returns a game's full event log, version ascending.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
pub async fn get_game_history(
    game_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<Vec<EventLogEntryView>, DomainError> {
    let stored_events = repo.load_events(game_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(game_id));
    }
    Ok(stored_events
        .into_iter()
        .map(EventLogEntryView::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use games_core::error::DomainError;
    use games_core::repository::StoredEvent;
    use games_test_support::{EmptyEventRepository, RecordingEventRepository};
    use uuid::Uuid;

    use super::*;
    use crate::application::read_store::InMemoryGameReadStore;
    use crate::domain::events::GAME_CREATED_EVENT_TYPE;

    fn record(game_id: Uuid, title: &str) -> GameRecord {
        GameRecord {
            game_id,
            title: title.to_owned(),
            price: 19.99,
            launch_year: 1995,
            developer: "Square".to_owned(),
            genre: Genre::Rpg,
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_get_game_by_id_returns_view_from_read_store() {
        // Arrange
        let store = InMemoryGameReadStore::new();
        let game_id = Uuid::new_v4();
        store
            .insert_if_absent(&record(game_id, "Chrono Trigger"))
            .await
            .unwrap();

        // Act
        let view = get_game_by_id(game_id, &store).await.unwrap();

        // Assert
        assert_eq!(view.game_id, game_id);
        assert_eq!(view.title, "Chrono Trigger");
        assert_eq!(view.genre, Genre::Rpg);
        assert_eq!(view.version, 0);
    }

    #[tokio::test]
    async fn test_get_game_by_id_returns_not_found_for_unknown_game() {
        let store = InMemoryGameReadStore::new();
        let game_id = Uuid::new_v4();

        let result = get_game_by_id(game_id, &store).await;

        match result {
            Err(DomainError::AggregateNotFound(id)) => assert_eq!(id, game_id),
            other => panic!("expected AggregateNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_games_is_ordered_by_title() {
        let store = InMemoryGameReadStore::new();
        store
            .insert_if_absent(&record(Uuid::new_v4(), "Secret of Mana"))
            .await
            .unwrap();
        store
            .insert_if_absent(&record(Uuid::new_v4(), "Chrono Trigger"))
            .await
            .unwrap();

        let games = list_games(&store).await.unwrap();

        let titles: Vec<&str> = games.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Chrono Trigger", "Secret of Mana"]);
    }

    #[tokio::test]
    async fn test_get_game_history_returns_event_log() {
        // Arrange
        let game_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let event = StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: game_id,
            event_type: GAME_CREATED_EVENT_TYPE.to_owned(),
            payload: serde_json::json!({ "aggregateId": game_id }),
            sequence_number: 0,
            correlation_id,
            causation_id: correlation_id,
            occurred_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        };
        let repo = RecordingEventRepository::new(vec![event.clone()]);

        // Act
        let history = get_game_history(game_id, &repo).await.unwrap();

        // Assert
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_id, event.event_id);
        assert_eq!(history[0].event_type, GAME_CREATED_EVENT_TYPE);
        assert_eq!(history[0].version, 0);
        assert_eq!(history[0].correlation_id, correlation_id);
    }

    #[tokio::test]
    async fn test_get_game_history_returns_not_found_for_empty_stream() {
        let game_id = Uuid::new_v4();

        let result = get_game_history(game_id, &EmptyEventRepository).await;

        assert!(matches!(result, Err(DomainError::AggregateNotFound(id)) if id == game_id));
    }
}
