//! Connection pool construction with start-up retries.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::warn;

/// Delay between connection attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Opens a pool, retrying up to `attempts` times while the database is still
/// coming up.
///
/// # Errors
///
/// Returns the last connection error once every attempt has failed.
pub async fn connect_with_retry(
    database_url: &str,
    max_connections: u32,
    attempts: u32,
) -> Result<PgPool, sqlx::Error> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < attempts => {
                warn!(attempt, attempts, error = %e, "database not reachable yet, retrying");
                attempt += 1;
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}
