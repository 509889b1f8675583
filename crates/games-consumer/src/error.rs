//! Startup errors for the consumer process.

use games_core::error::DomainError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Errors that stop the consumer from starting.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] MigrateError),

    /// The bus or the rebuild failed.
    #[error("bus error: {0}")]
    Bus(#[from] DomainError),
}
