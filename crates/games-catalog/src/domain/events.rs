//! Domain events for the catalog context.

use games_core::error::DomainError;
use games_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attributes::GameAttributes;
use super::genre::Genre;

/// Stored event type of `GameCreated`.
pub const GAME_CREATED_EVENT_TYPE: &str = "GameCreated";
/// Stored event type of `GameUpdated`.
pub const GAME_UPDATED_EVENT_TYPE: &str = "GameUpdated";
/// Stored event type of `GameDeleted`.
pub const GAME_DELETED_EVENT_TYPE: &str = "GameDeleted";

/// Emitted when a game is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCreated {
    /// The game identifier.
    pub aggregate_id: Uuid,
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
}

/// Emitted when a game's attributes change. Carries the full resulting
/// attribute set so consumers can overwrite without reading prior state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdated {
    /// The game identifier.
    pub aggregate_id: Uuid,
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
}

/// Emitted when a game is removed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDeleted {
    /// The game identifier.
    pub aggregate_id: Uuid,
}

impl GameCreated {
    /// Builds the event from validated attributes.
    #[must_use]
    pub fn new(aggregate_id: Uuid, attributes: GameAttributes) -> Self {
        Self {
            aggregate_id,
            title: attributes.title,
            price: attributes.price,
            launch_year: attributes.launch_year,
            developer: attributes.developer,
            genre: attributes.genre,
        }
    }

    /// The attributes this event sets.
    #[must_use]
    pub fn attributes(&self) -> GameAttributes {
        GameAttributes {
            title: self.title.clone(),
            price: self.price,
            launch_year: self.launch_year,
            developer: self.developer.clone(),
            genre: self.genre,
        }
    }
}

impl GameUpdated {
    /// Builds the event from validated attributes.
    #[must_use]
    pub fn new(aggregate_id: Uuid, attributes: GameAttributes) -> Self {
        Self {
            aggregate_id,
            title: attributes.title,
            price: attributes.price,
            launch_year: attributes.launch_year,
            developer: attributes.developer,
            genre: attributes.genre,
        }
    }

    /// The attributes this event sets.
    #[must_use]
    pub fn attributes(&self) -> GameAttributes {
        GameAttributes {
            title: self.title.clone(),
            price: self.price,
            launch_year: self.launch_year,
            developer: self.developer.clone(),
            genre: self.genre,
        }
    }
}

/// The bus discriminator of a game event.
///
/// Dispatch on the consumer side goes through this closed enum rather than
/// raw strings, so adding an event type is a compile error until every
/// handler table covers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEventSubject {
    /// A game was created.
    Created,
    /// A game was updated.
    Updated,
    /// A game was deleted.
    Deleted,
}

impl GameEventSubject {
    /// The `subject` value carried by bus messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
        }
    }

    /// The stored event type / bus event name.
    #[must_use]
    pub const fn event_type(self) -> &'static str {
        match self {
            Self::Created => GAME_CREATED_EVENT_TYPE,
            Self::Updated => GAME_UPDATED_EVENT_TYPE,
            Self::Deleted => GAME_DELETED_EVENT_TYPE,
        }
    }

    /// Parses a bus subject or a stored event type. Returns `None` for
    /// anything else.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Created, Self::Updated, Self::Deleted]
            .into_iter()
            .find(|subject| value == subject.as_str() || value == subject.event_type())
    }
}

/// Event payload variants for the catalog context.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEventKind {
    /// A game has been created.
    Created(GameCreated),
    /// A game has been updated.
    Updated(GameUpdated),
    /// A game has been deleted.
    Deleted(GameDeleted),
}

impl GameEventKind {
    /// The bus subject for this event.
    #[must_use]
    pub const fn subject(&self) -> GameEventSubject {
        match self {
            Self::Created(_) => GameEventSubject::Created,
            Self::Updated(_) => GameEventSubject::Updated,
            Self::Deleted(_) => GameEventSubject::Deleted,
        }
    }

    /// The aggregate this event belongs to.
    #[must_use]
    pub const fn aggregate_id(&self) -> Uuid {
        match self {
            Self::Created(e) => e.aggregate_id,
            Self::Updated(e) => e.aggregate_id,
            Self::Deleted(e) => e.aggregate_id,
        }
    }

    /// Serializes the variant's payload without an enum tag; the event type
    /// travels beside it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        let value = match self {
            Self::Created(e) => serde_json::to_value(e),
            Self::Updated(e) => serde_json::to_value(e),
            Self::Deleted(e) => serde_json::to_value(e),
        };
        value.map_err(|e| DomainError::Infrastructure(format!("event serialization failed: {e}")))
    }

    /// Decodes a payload stored under `event_type`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Deserialization` for an unknown event type or a
    /// payload that does not match it.
    pub fn from_payload(event_type: &str, payload: &serde_json::Value) -> Result<Self, DomainError> {
        let subject = GameEventSubject::parse(event_type).ok_or_else(|| {
            DomainError::Deserialization(format!("unknown event type: {event_type}"))
        })?;
        let decoded = match subject {
            GameEventSubject::Created => {
                serde_json::from_value(payload.clone()).map(Self::Created)
            }
            GameEventSubject::Updated => {
                serde_json::from_value(payload.clone()).map(Self::Updated)
            }
            GameEventSubject::Deleted => {
                serde_json::from_value(payload.clone()).map(Self::Deleted)
            }
        };
        decoded.map_err(|e| {
            DomainError::Deserialization(format!("{event_type} payload is malformed: {e}"))
        })
    }
}

/// Domain event envelope for the catalog context.
#[derive(Debug, Clone)]
pub struct GameEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: GameEventKind,
}

impl DomainEvent for GameEvent {
    fn event_type(&self) -> &'static str {
        self.kind.subject().event_type()
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        self.kind.to_payload()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_parses_short_and_qualified_names() {
        assert_eq!(
            GameEventSubject::parse("Created"),
            Some(GameEventSubject::Created)
        );
        assert_eq!(
            GameEventSubject::parse("GameUpdated"),
            Some(GameEventSubject::Updated)
        );
        assert_eq!(GameEventSubject::parse("GameArchived"), None);
    }

    #[test]
    fn test_created_payload_is_camel_case_without_tag() {
        let id = Uuid::new_v4();
        let kind = GameEventKind::Created(GameCreated {
            aggregate_id: id,
            title: "Chrono Trigger".to_owned(),
            price: 19.99,
            launch_year: 1995,
            developer: "Square".to_owned(),
            genre: Genre::Rpg,
        });

        let payload = kind.to_payload().unwrap();

        assert_eq!(
            payload,
            serde_json::json!({
                "aggregateId": id,
                "title": "Chrono Trigger",
                "price": 19.99,
                "launchYear": 1995,
                "developer": "Square",
                "genre": "RPG"
            })
        );
    }

    #[test]
    fn test_from_payload_rejects_unknown_event_type() {
        let result = GameEventKind::from_payload("GameArchived", &serde_json::json!({}));

        assert!(matches!(result, Err(DomainError::Deserialization(_))));
    }

    #[test]
    fn test_from_payload_rejects_mismatched_payload() {
        let result =
            GameEventKind::from_payload(GAME_CREATED_EVENT_TYPE, &serde_json::json!({"x": 1}));

        assert!(matches!(result, Err(DomainError::Deserialization(_))));
    }

    #[test]
    fn test_deleted_payload_decodes() {
        let id = Uuid::new_v4();

        let kind = GameEventKind::from_payload(
            GAME_DELETED_EVENT_TYPE,
            &serde_json::json!({ "aggregateId": id }),
        )
        .unwrap();

        assert_eq!(kind, GameEventKind::Deleted(GameDeleted { aggregate_id: id }));
    }
}
