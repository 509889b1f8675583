//! Replay of the event log and rebuild of the read store from it.

use std::collections::HashSet;

use games_core::aggregate::AggregateRoot;
use games_core::error::DomainError;
use games_core::repository::EventRepository;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::command_handlers::reconstitute;
use crate::application::read_store::{GameReadStore, GameRecord};

/// The state of a game after folding its whole event log.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayedGame {
    /// The game is live; this is the row the read store should hold.
    Live(GameRecord),
    /// The game was deleted by the event at `version`.
    Deleted {
        /// The game identifier.
        game_id: Uuid,
        /// Sequence number of the delete.
        version: i64,
    },
}

/// Counts from a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Rows written.
    pub live: usize,
    /// Games removed from the read store.
    pub deleted: usize,
    /// Rows dropped because their game has no events.
    pub pruned: usize,
}

/// Folds a game's event log, version ascending, into its current state.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if the game has no events, and
/// any error from decoding the stream.
pub async fn replay_game(
    game_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<ReplayedGame, DomainError> {
    let stored_events = repo.load_events(game_id).await?;
    let game = reconstitute(game_id, &stored_events)?;
    let version = game
        .last_sequence_number()
        .ok_or(DomainError::AggregateNotFound(game_id))?;
    Ok(match game.attributes() {
        Some(attributes) => {
            ReplayedGame::Live(GameRecord::from_attributes(game_id, attributes, version))
        }
        None => ReplayedGame::Deleted { game_id, version },
    })
}

async fn write_replayed(
    replayed: &ReplayedGame,
    read_store: &dyn GameReadStore,
) -> Result<(), DomainError> {
    match replayed {
        ReplayedGame::Live(record) => read_store.replace(record).await,
        ReplayedGame::Deleted { game_id, version } => {
            read_store.remove(*game_id, *version).await.map(|_| ())
        }
    }
}

/// Replays one game and overwrites its read model row with the result.
///
/// # Errors
///
/// Returns any error from [`replay_game`] or the read store.
pub async fn rebuild_game_projection(
    game_id: Uuid,
    repo: &dyn EventRepository,
    read_store: &dyn GameReadStore,
) -> Result<ReplayedGame, DomainError> {
    let replayed = replay_game(game_id, repo).await?;
    write_replayed(&replayed, read_store).await?;
    info!(aggregate_id = %game_id, "projection rebuilt from event log");
    Ok(replayed)
}

/// Replays every game in the event store into the read store.
///
/// Deletions are written first. A live row whose natural key is still held
/// by a stale row is retried after the others; if a pass makes no
/// progress the rebuild fails. Rows whose game has no events are then
/// purged.
///
/// # Errors
///
/// Returns the first replay or read store error, or
/// `DomainError::DuplicateAggregate` if the event log itself holds two live
/// games with the same natural key.
pub async fn rebuild_all_projections(
    repo: &dyn EventRepository,
    read_store: &dyn GameReadStore,
) -> Result<RebuildSummary, DomainError> {
    let mut summary = RebuildSummary::default();
    let mut pending = Vec::new();
    let game_ids = repo.aggregate_ids().await?;
    for &game_id in &game_ids {
        match replay_game(game_id, repo).await? {
            deleted @ ReplayedGame::Deleted { .. } => {
                write_replayed(&deleted, read_store).await?;
                summary.deleted += 1;
            }
            live @ ReplayedGame::Live(_) => pending.push(live),
        }
    }

    while !pending.is_empty() {
        let before = pending.len();
        let mut blocked = Vec::new();
        let mut last_conflict = None;
        for replayed in pending {
            match write_replayed(&replayed, read_store).await {
                Ok(()) => summary.live += 1,
                Err(DomainError::DuplicateAggregate(msg)) => {
                    warn!(conflict = %msg, "natural key still held; retrying after other games");
                    last_conflict = Some(msg);
                    blocked.push(replayed);
                }
                Err(e) => return Err(e),
            }
        }
        if blocked.len() == before {
            return Err(DomainError::DuplicateAggregate(
                last_conflict.unwrap_or_default(),
            ));
        }
        pending = blocked;
    }

    let known: HashSet<Uuid> = game_ids.into_iter().collect();
    for row in read_store.list().await? {
        if !known.contains(&row.game_id) && read_store.purge(row.game_id).await? {
            warn!(aggregate_id = %row.game_id, "read model row has no events; purged");
            summary.pruned += 1;
        }
    }

    info!(
        live = summary.live,
        deleted = summary.deleted,
        pruned = summary.pruned,
        "read store rebuilt from event log"
    );
    Ok(summary)
}
