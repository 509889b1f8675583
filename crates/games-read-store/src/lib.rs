//! PostgreSQL read model for the games service.

pub mod pg_game_read_store;

use sqlx::PgPool;
use sqlx::migrate::MigrateError;

/// Applies the read model migrations.
///
/// Migrations recorded by other stores sharing the database are ignored.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or was altered after being
/// applied.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    let mut migrator = sqlx::migrate!();
    migrator.set_ignore_missing(true);
    migrator.run(pool).await
}
