use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// How often the deadline monitor scans for expired rooms. Rooms close
    /// within one interval of their deadline, not instantly.
    pub sweep_interval: Duration,
    /// Capacity of each broadcast channel. A subscriber that falls this far
    /// behind is resynchronised with a fresh snapshot.
    pub event_buffer: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}")]
    Invalid(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("BIND_ADDR"))?;

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let sweep_interval = match std::env::var("SWEEP_INTERVAL_SECS") {
            Ok(value) => Duration::from_secs(
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid("SWEEP_INTERVAL_SECS"))?,
            ),
            Err(_) => Duration::from_secs(5),
        };

        let event_buffer = match std::env::var("EVENT_BUFFER") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("EVENT_BUFFER"))?,
            Err(_) => 100,
        };

        Ok(Config {
            database_url,
            bind_addr,
            jwt_secret,
            sweep_interval,
            event_buffer,
        })
    }
}
