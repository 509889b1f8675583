//! API configuration read from the environment.

use std::net::SocketAddr;

use games_messaging::settings::BusSettings;

use crate::error::AppError;

/// Settings for the API process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Event store connection string.
    pub database_url: String,
    /// Read store connection string.
    pub read_database_url: String,
    /// Broker settings.
    pub bus: BusSettings,
    /// Address to listen on.
    pub listen_addr: SocketAddr,
    /// Connection attempts at start-up before giving up.
    pub db_connect_attempts: u32,
    /// Pool size per database.
    pub db_max_connections: u32,
    /// OTLP collector endpoint; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
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
            .parse()
            .map_err(|e| AppError::Config(format!("{name} is invalid: {e}"))),
        None => Ok(default),
    }
}

impl ApiConfig {
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
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".to_owned()))?;
        let read_database_url =
            lookup("READ_DATABASE_URL").unwrap_or_else(|| database_url.clone());
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let listen_addr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        Ok(Self {
            database_url,
            read_database_url,
            bus: BusSettings {
                url: lookup("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_owned()),
                stream: lookup("GAMES_STREAM").unwrap_or_else(|| "GAMES".to_owned()),
                topic: lookup("GAMES_TOPIC").unwrap_or_else(|| "games".to_owned()),
            },
            listen_addr,
            db_connect_attempts: parse_or(&lookup, "DB_CONNECT_ATTEMPTS", 5)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        // Arrange
        let lookup = lookup_from(&[("DATABASE_URL", "postgres://localhost/games")]);

        // Act
        let config = ApiConfig::from_lookup(lookup).unwrap();

        // Assert
        assert_eq!(config.read_database_url, "postgres://localhost/games");
        assert_eq!(config.bus.url, "nats://localhost:4222");
        assert_eq!(config.bus.stream, "GAMES");
        assert_eq!(config.bus.topic, "games");
        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.db_connect_attempts, 5);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.otlp_endpoint, None);
    }

    #[test]
    fn test_missing_database_url_is_a_config_error() {
        let result = ApiConfig::from_lookup(lookup_from(&[]));

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("DATABASE_URL")));
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        let lookup = lookup_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]);

        let result = ApiConfig::from_lookup(lookup);

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("PORT")));
    }

    #[test]
    fn test_overrides_are_read() {
        let lookup = lookup_from(&[
            ("DATABASE_URL", "postgres://events"),
            ("READ_DATABASE_URL", "postgres://reads"),
            ("GAMES_TOPIC", "catalog"),
            ("PORT", "8080"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317"),
        ]);

        let config = ApiConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.read_database_url, "postgres://reads");
        assert_eq!(config.bus.topic, "catalog");
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
    }
}
