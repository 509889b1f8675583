//! Games service: HTTP API.
//!
//! Commands are accepted on the write path and answered with a locally
//! projected view; queries are served from the read store and may lag.

pub mod config;
pub mod correlation;
pub mod error;
pub mod routes;
pub mod shutdown;
pub mod state;
pub mod telemetry;

use axum::Router;
use axum::middleware;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full router with its middleware stack.
pub fn app(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/games", routes::games::router())
        .layer(middleware::from_fn(correlation::propagate_correlation_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
