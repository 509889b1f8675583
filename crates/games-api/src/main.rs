//! Games API server entry point.

use std::sync::Arc;

use games_api::config::ApiConfig;
use games_api::error::AppError;
use games_api::shutdown::ShutdownSignal;
use games_api::state::AppState;
use games_api::{app, telemetry};
use games_core::clock::SystemClock;
use games_event_store::pg_event_repository::PgEventRepository;
use games_event_store::pool::connect_with_retry;
use games_messaging::publisher::NatsEventPublisher;
use games_messaging::subscription::ensure_stream;
use games_read_store::pg_game_read_store::PgGameReadStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    let config = ApiConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting games API server");

    // Event store and read store may share one database.
    let event_pool = connect_with_retry(
        &config.database_url,
        config.db_max_connections,
        config.db_connect_attempts,
    )
    .await?;
    games_event_store::run_migrations(&event_pool).await?;

    let read_pool = connect_with_retry(
        &config.read_database_url,
        config.db_max_connections,
        config.db_connect_attempts,
    )
    .await?;
    games_read_store::run_migrations(&read_pool).await?;

    let bus = games_messaging::connect(&config.bus).await?;
    ensure_stream(&bus, &config.bus).await?;

    let shutdown = ShutdownSignal::new();
    tokio::spawn(shutdown.clone().trigger_on_ctrl_c());

    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(PgEventRepository::new(event_pool)),
        Arc::new(NatsEventPublisher::new(bus, config.bus.clone())),
        Arc::new(PgGameReadStore::new(read_pool)),
        shutdown.clone(),
    );

    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!("server stopped");
    telemetry.shutdown();
    Ok(())
}
