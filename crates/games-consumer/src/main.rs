//! Games projection consumer entry point.

use games_catalog::application::replay::rebuild_all_projections;
use games_consumer::config::ConsumerConfig;
use games_consumer::error::AppError;
use games_consumer::worker;
use games_event_store::pg_event_repository::PgEventRepository;
use games_event_store::pool::connect_with_retry;
use games_messaging::subscription::subscribe;
use games_read_store::pg_game_read_store::PgGameReadStore;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting games projection consumer");

    let config = ConsumerConfig::from_env()?;

    let read_pool = connect_with_retry(
        &config.read_database_url,
        config.db_max_connections,
        config.db_connect_attempts,
    )
    .await?;
    games_read_store::run_migrations(&read_pool).await?;
    let read_store = PgGameReadStore::new(read_pool);

    if config.rebuild_on_start {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| AppError::Config("REBUILD_ON_START requires DATABASE_URL".to_owned()))?;
        let event_pool = connect_with_retry(
            database_url,
            config.db_max_connections,
            config.db_connect_attempts,
        )
        .await?;
        games_event_store::run_migrations(&event_pool).await?;
        let summary =
            rebuild_all_projections(&PgEventRepository::new(event_pool), &read_store).await?;
        tracing::info!(
            live = summary.live,
            deleted = summary.deleted,
            pruned = summary.pruned,
            "rebuild finished"
        );
    }

    let bus = games_messaging::connect(&config.bus).await?;
    let deliveries = subscribe(&bus, &config.bus, &config.subscription).await?;

    worker::run(
        deliveries,
        &read_store,
        config.max_concurrency,
        shutdown_signal(),
    )
    .await;

    tracing::info!("consumer stopped");
    Ok(())
}
