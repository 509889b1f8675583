//! Routes for the games catalog.
//!
//! Commands are answered with `202 Accepted`: the event is stored and
//! published, but the read store catches up asynchronously. Queries read
//! the read store and may lag behind a just-accepted command.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{info, instrument};
use uuid::Uuid;

use games_catalog::application::command_handlers::{self, GameCommandResult, PublishStatus};
use games_catalog::application::query_handlers::{self, EventLogEntryView, GameView};
use games_catalog::domain::attributes::{GameAttributes, GameChanges};
use games_catalog::domain::commands;
use games_catalog::domain::genre::Genre;
use games_core::error::DomainError;

use crate::correlation::CorrelationId;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    /// Caller-chosen identifier; generated when absent.
    pub game_id: Option<Uuid>,
    /// Title.
    pub title: String,
    /// Price.
    pub price: f64,
    /// Launch year.
    pub launch_year: i32,
    /// Developer.
    pub developer: String,
    /// Genre name, case-insensitive.
    pub genre: String,
}

/// Request body for PUT /{id}. Absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGameRequest {
    /// New title.
    pub title: Option<String>,
    /// New price.
    pub price: Option<f64>,
    /// New launch year.
    pub launch_year: Option<i32>,
    /// New developer.
    pub developer: Option<String>,
    /// New genre name.
    pub genre: Option<String>,
}

/// Response body returned after a command is accepted.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The game the command applied to.
    pub game_id: Uuid,
    /// Correlation id carried by the stored events.
    pub correlation_id: Uuid,
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
    /// Version of the last stored event.
    pub version: Option<i64>,
    /// The game as projected from the command; absent after a delete.
    pub game: Option<GameView>,
    /// `"published"` or `"failed"`.
    pub publish_status: &'static str,
    /// Set when the events were stored but not published.
    pub warning: Option<String>,
}

impl CommandResponse {
    fn new(result: GameCommandResult, correlation_id: Uuid) -> Self {
        let (publish_status, warning) = match result.publish_status {
            PublishStatus::Published => ("published", None),
            PublishStatus::Failed { reason } => (
                "failed",
                Some(format!(
                    "event stored but not published ({reason}); republish the game to update the catalog"
                )),
            ),
        };
        Self {
            game_id: result.game_id,
            correlation_id,
            event_ids: result.stored_events.iter().map(|e| e.event_id).collect(),
            version: result.stored_events.last().map(|e| e.sequence_number),
            game: result.game,
            publish_status,
            warning,
        }
    }
}

/// Response body for POST /{id}/republish.
#[derive(Debug, Serialize)]
pub struct RepublishResponse {
    /// The game whose events were republished.
    pub game_id: Uuid,
    /// Correlation id of the republish request.
    pub correlation_id: Uuid,
    /// IDs of the events handed to the bus, in version order.
    pub event_ids: Vec<Uuid>,
}

fn parse_genre(raw: &str) -> Result<Genre, DomainError> {
    raw.parse::<Genre>()
        .map_err(|e| DomainError::Validation(e.to_string()))
}

fn joined<T>(result: Result<Result<T, DomainError>, JoinError>) -> Result<T, ApiError> {
    result
        .map_err(|e| DomainError::Infrastructure(format!("command task failed: {e}")))?
        .map_err(ApiError::from)
}

/// POST /
#[instrument(skip(state, request), fields(correlation_id = %correlation_id))]
async fn create_game(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    Json(request): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = commands::CreateGame {
        correlation_id,
        game_id: request.game_id.unwrap_or_else(Uuid::new_v4),
        attributes: GameAttributes {
            title: request.title,
            price: request.price,
            launch_year: request.launch_year,
            developer: request.developer,
            genre: parse_genre(&request.genre)?,
        },
    };

    info!(game_id = %command.game_id, "handling create_game command");

    // Detached so a dropped connection cannot interrupt the publish step.
    let result = joined(
        tokio::spawn(async move {
            command_handlers::handle_create_game(&command, state.command_context()).await
        })
        .await,
    )?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CommandResponse::new(result, correlation_id)),
    ))
}

/// PUT /{id}
#[instrument(skip(state, request), fields(correlation_id = %correlation_id))]
async fn update_game(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    Path(game_id): Path<Uuid>,
    Json(request): Json<UpdateGameRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = commands::UpdateGame {
        correlation_id,
        game_id,
        changes: GameChanges {
            title: request.title,
            price: request.price,
            launch_year: request.launch_year,
            developer: request.developer,
            genre: request.genre.as_deref().map(parse_genre).transpose()?,
        },
    };

    info!("handling update_game command");

    let result = joined(
        tokio::spawn(async move {
            command_handlers::handle_update_game(&command, state.command_context()).await
        })
        .await,
    )?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CommandResponse::new(result, correlation_id)),
    ))
}

/// DELETE /{id}
#[instrument(skip(state), fields(correlation_id = %correlation_id))]
async fn delete_game(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    Path(game_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = commands::DeleteGame {
        correlation_id,
        game_id,
    };

    info!("handling delete_game command");

    let result = joined(
        tokio::spawn(async move {
            command_handlers::handle_delete_game(&command, state.command_context()).await
        })
        .await,
    )?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CommandResponse::new(result, correlation_id)),
    ))
}

/// POST /{id}/republish
#[instrument(skip(state), fields(correlation_id = %correlation_id))]
async fn republish_game(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    Path(game_id): Path<Uuid>,
) -> Result<(StatusCode, Json<RepublishResponse>), ApiError> {
    let command = commands::RepublishGame {
        correlation_id,
        game_id,
    };

    let stored_events = joined(
        tokio::spawn(async move {
            command_handlers::handle_republish_game(&command, state.command_context()).await
        })
        .await,
    )?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RepublishResponse {
            game_id,
            correlation_id,
            event_ids: stored_events.iter().map(|e| e.event_id).collect(),
        }),
    ))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameView>, ApiError> {
    let view = query_handlers::get_game_by_id(game_id, state.read_store.as_ref()).await?;
    Ok(Json(view))
}

/// GET /
#[instrument(skip(state))]
async fn list_games(State(state): State<AppState>) -> Result<Json<Vec<GameView>>, ApiError> {
    let views = query_handlers::list_games(state.read_store.as_ref()).await?;
    Ok(Json(views))
}

/// GET /{id}/events
#[instrument(skip(state))]
async fn get_game_events(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<Vec<EventLogEntryView>>, ApiError> {
    let history =
        query_handlers::get_game_history(game_id, state.event_repository.as_ref()).await?;
    Ok(Json(history))
}

/// Returns the router for the games catalog.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_game).get(list_games))
        .route("/{id}", get(get_game).put(update_game).delete(delete_game))
        .route("/{id}/events", get(get_game_events))
        .route("/{id}/republish", post(republish_game))
}
