//! The read store port and its in-memory implementation.
//!
//! The read store is a derived cache of the event log. Every mutation is
//! keyed by aggregate id and carries the version of the event that caused
//! it, so redelivered or reordered messages cannot move a row backwards.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use games_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::attributes::{GameAttributes, NaturalKey};
use crate::domain::genre::Genre;

/// A read model row: the current state of one live game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
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
    /// Sequence number of the last event reflected in this row.
    pub version: i64,
}

impl GameRecord {
    /// Builds a row from a game's attributes.
    #[must_use]
    pub fn from_attributes(game_id: Uuid, attributes: &GameAttributes, version: i64) -> Self {
        Self {
            game_id,
            title: attributes.title.clone(),
            price: attributes.price,
            launch_year: attributes.launch_year,
            developer: attributes.developer.clone(),
            genre: attributes.genre,
            version,
        }
    }

    /// The attributes held by this row.
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

    /// The natural duplicate key of this row.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            title: self.title.clone(),
            developer: self.developer.clone(),
            launch_year: self.launch_year,
        }
    }
}

/// Result of [`GameReadStore::insert_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// A row for this game already exists.
    AlreadyPresent,
    /// The game has been deleted; the insert is a late redelivery.
    Tombstoned,
    /// Another game already holds the natural key.
    NaturalKeyTaken,
}

/// Result of [`GameReadStore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The row was overwritten.
    Applied,
    /// The row already reflects this version or a later one, or the game
    /// has been deleted.
    Stale,
    /// No row exists for the game.
    Missing,
    /// Another game already holds the new natural key.
    NaturalKeyConflict,
}

/// Storage port for the read model.
#[async_trait]
pub trait GameReadStore: Send + Sync {
    /// Loads the row of a game.
    async fn find_by_id(&self, game_id: Uuid) -> Result<Option<GameRecord>, DomainError>;

    /// Loads the row holding a natural key.
    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<GameRecord>, DomainError>;

    /// Lists every row, ordered by title then id.
    async fn list(&self) -> Result<Vec<GameRecord>, DomainError>;

    /// Inserts a row unless one exists for the game or its natural key, or
    /// the game has been deleted.
    async fn insert_if_absent(&self, record: &GameRecord) -> Result<InsertOutcome, DomainError>;

    /// Overwrites a row when `record.version` is newer than the stored one.
    async fn update(&self, record: &GameRecord) -> Result<UpdateOutcome, DomainError>;

    /// Removes a game's row and records a tombstone at `version`. Returns
    /// `false` when there was no row to remove.
    async fn remove(&self, game_id: Uuid, version: i64) -> Result<bool, DomainError>;

    /// Writes a row unconditionally and clears any tombstone. Used when
    /// rebuilding from the event log.
    async fn replace(&self, record: &GameRecord) -> Result<(), DomainError>;

    /// Deletes a game's row without recording a tombstone. Returns `false`
    /// when there was no row. Used to drop rows with no event history.
    async fn purge(&self, game_id: Uuid) -> Result<bool, DomainError>;
}

#[derive(Debug, Default)]
struct ReadState {
    rows: HashMap<Uuid, GameRecord>,
    tombstones: HashMap<Uuid, i64>,
}

impl ReadState {
    fn holder_of(&self, key: &NaturalKey) -> Option<&GameRecord> {
        self.rows.values().find(|row| &row.natural_key() == key)
    }
}

/// A read store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryGameReadStore {
    state: Mutex<ReadState>,
}

impl InMemoryGameReadStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ReadState) -> T) -> Result<T, DomainError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("read store lock poisoned: {e}")))?;
        Ok(f(&mut state))
    }
}

#[async_trait]
impl GameReadStore for InMemoryGameReadStore {
    async fn find_by_id(&self, game_id: Uuid) -> Result<Option<GameRecord>, DomainError> {
        self.with_state(|state| state.rows.get(&game_id).cloned())
    }

    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<GameRecord>, DomainError> {
        self.with_state(|state| state.holder_of(key).cloned())
    }

    async fn list(&self) -> Result<Vec<GameRecord>, DomainError> {
        self.with_state(|state| {
            let mut rows: Vec<GameRecord> = state.rows.values().cloned().collect();
            rows.sort_by(|a, b| a.title.cmp(&b.title).then(a.game_id.cmp(&b.game_id)));
            rows
        })
    }

    async fn insert_if_absent(&self, record: &GameRecord) -> Result<InsertOutcome, DomainError> {
        self.with_state(|state| {
            if state.tombstones.contains_key(&record.game_id) {
                return InsertOutcome::Tombstoned;
            }
            if state.rows.contains_key(&record.game_id) {
                return InsertOutcome::AlreadyPresent;
            }
            if state.holder_of(&record.natural_key()).is_some() {
                return InsertOutcome::NaturalKeyTaken;
            }
            state.rows.insert(record.game_id, record.clone());
            InsertOutcome::Inserted
        })
    }

    async fn update(&self, record: &GameRecord) -> Result<UpdateOutcome, DomainError> {
        self.with_state(|state| {
            if state.tombstones.contains_key(&record.game_id) {
                return UpdateOutcome::Stale;
            }
            let Some(current) = state.rows.get(&record.game_id) else {
                return UpdateOutcome::Missing;
            };
            if current.version >= record.version {
                return UpdateOutcome::Stale;
            }
            if state
                .holder_of(&record.natural_key())
                .is_some_and(|holder| holder.game_id != record.game_id)
            {
                return UpdateOutcome::NaturalKeyConflict;
            }
            state.rows.insert(record.game_id, record.clone());
            UpdateOutcome::Applied
        })
    }

    async fn remove(&self, game_id: Uuid, version: i64) -> Result<bool, DomainError> {
        self.with_state(|state| {
            let tombstone = state.tombstones.entry(game_id).or_insert(version);
            *tombstone = (*tombstone).max(version);
            state.rows.remove(&game_id).is_some()
        })
    }

    async fn replace(&self, record: &GameRecord) -> Result<(), DomainError> {
        self.with_state(|state| {
            let key = record.natural_key();
            if let Some(holder) = state
                .holder_of(&key)
                .filter(|holder| holder.game_id != record.game_id)
            {
                return Err(DomainError::DuplicateAggregate(format!(
                    "{key} is held by game {}",
                    holder.game_id
                )));
            }
            state.tombstones.remove(&record.game_id);
            state.rows.insert(record.game_id, record.clone());
            Ok(())
        })?
    }

    async fn purge(&self, game_id: Uuid) -> Result<bool, DomainError> {
        self.with_state(|state| state.rows.remove(&game_id).is_some())
    }
}
