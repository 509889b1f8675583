//! Consumer configuration read from the environment.

use std::time::Duration;

use games_messaging::settings::{BusSettings, SubscriptionSettings};

use crate::error::AppError;

/// Settings for the consumer process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Read store connection string.
    pub read_database_url: String,
    /// Event store connection string; required when rebuilding on start.
    pub database_url: Option<String>,
    /// Broker settings.
    pub bus: BusSettings,
    /// Durable subscription settings.
    pub subscription: SubscriptionSettings,
    /// Messages handled at the same time.
    pub max_concurrency: usize,
    /// Rebuild the read store from the event log before subscribing.
    pub rebuild_on_start: bool,
    /// Connection attempts at start-up before giving up.
    pub db_connect_attempts: u32,
    /// Pool size per database.
    pub db_max_connections: u32,
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{name} is invalid: {e}"))),
        None => Ok(default),
    }
}

impl ConsumerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing, a value
    /// does not parse, or a rebuild is requested without `DATABASE_URL`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let read_database_url = lookup("READ_DATABASE_URL")
            .ok_or_else(|| AppError::Config("READ_DATABASE_URL must be set".to_owned()))?;
        let database_url = lookup("DATABASE_URL");
        let rebuild_on_start = parse_or(&lookup, "REBUILD_ON_START", false)?;
        if rebuild_on_start && database_url.is_none() {
            return Err(AppError::Config(
                "REBUILD_ON_START requires DATABASE_URL".to_owned(),
            ));
        }

        let prefetch: u32 = parse_or(&lookup, "CONSUMER_PREFETCH", 20)?;
        let max_concurrency: usize = parse_or(&lookup, "CONSUMER_MAX_CONCURRENCY", 4)?;
        if prefetch == 0 || max_concurrency == 0 {
            return Err(AppError::Config(
                "CONSUMER_PREFETCH and CONSUMER_MAX_CONCURRENCY must be positive".to_owned(),
            ));
        }

        Ok(Self {
            read_database_url,
            database_url,
            bus: BusSettings {
                url: lookup("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_owned()),
                stream: lookup("GAMES_STREAM").unwrap_or_else(|| "GAMES".to_owned()),
                topic: lookup("GAMES_TOPIC").unwrap_or_else(|| "games".to_owned()),
            },
            subscription: SubscriptionSettings {
                name: lookup("GAMES_SUBSCRIPTION").unwrap_or_else(|| "games-api-sub".to_owned()),
                prefetch,
                ack_wait: Duration::from_secs(parse_or(&lookup, "CONSUMER_ACK_WAIT_SECS", 30)?),
                max_deliver: parse_or(&lookup, "CONSUMER_MAX_DELIVER", 10)?,
            },
            max_concurrency,
            rebuild_on_start,
            db_connect_attempts: parse_or(&lookup, "DB_CONNECT_ATTEMPTS", 5)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
        })
    }
}
