//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::util::rate_limit::DEFAULT_MESSAGE_RATE_LIMIT;
use crate::util::time::DEFAULT_TICK_RATE;

/// Highest accepted simulation rate
const MAX_TICK_RATE: u32 = 240;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma-separated, or `*`
    pub client_origin: String,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Seed for spawn placement; random when unset
    pub spawn_seed: Option<u64>,
    /// Inbound WebSocket messages per second per connection
    pub message_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR, as on most hosting platforms
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let tick_rate = parse_or(&lookup, "TICK_RATE", DEFAULT_TICK_RATE)?;
        if tick_rate == 0 || tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::OutOfRange("TICK_RATE"));
        }

        let message_rate_limit = parse_or(&lookup, "MESSAGE_RATE_LIMIT", DEFAULT_MESSAGE_RATE_LIMIT)?;
        if message_rate_limit == 0 {
            return Err(ConfigError::OutOfRange("MESSAGE_RATE_LIMIT"));
        }

        let spawn_seed = match lookup("SPAWN_SEED") {
            Some(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::Invalid("SPAWN_SEED"))?),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            tick_rate,
            spawn_seed,
            message_rate_limit,
        })
    }
}

fn parse_or<F>(lookup: &F, key: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {0} is not a valid number")]
    Invalid(&'static str),

    #[error("Environment variable {0} is out of range")]
    OutOfRange(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
