//! Process configuration, read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `LEDGER_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `LEDGER_STORE` | `memory` | `memory`, `postgres` or `http` |
//! | `DATABASE_URL` | | required when `LEDGER_STORE=postgres` |
//! | `LEDGER_API_URL` | | required when `LEDGER_STORE=http` |
//! | `LOAN_STATUS_URL` | | loan service base URL; unset means a static zero snapshot |
//! | `LEDGER_TIMESTAMP_SOURCE` | `processing` | `processing` or `event` |
//! | `LEDGER_HTTP_TIMEOUT_SECS` | `15` | timeout for outbound HTTP calls |
//! | `LEDGER_RETRY_MAX_ATTEMPTS` | `5` | store-write retries per batch before failures log at `error` |

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::recorder::TimestampSource;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Where ledger entries are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { database_url: String },
    Http { base_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    pub loan_status_url: Option<String>,
    pub timestamp_source: TimestampSource,
    pub http_timeout: Duration,
    pub retry_max_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("LEDGER_BIND_ADDR") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                var: "LEDGER_BIND_ADDR",
                message: format!("{e}"),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let store = match get("LEDGER_STORE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("postgres") => StoreBackend::Postgres {
                database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            Some("http") => StoreBackend::Http {
                base_url: get("LEDGER_API_URL").ok_or(ConfigError::Missing("LEDGER_API_URL"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LEDGER_STORE",
                    message: format!("expected memory, postgres or http, got '{other}'"),
                });
            }
        };

        let timestamp_source = match get("LEDGER_TIMESTAMP_SOURCE") {
            Some(raw) => raw.parse::<TimestampSource>().map_err(|e| ConfigError::Invalid {
                var: "LEDGER_TIMESTAMP_SOURCE",
                message: e.to_string(),
            })?,
            None => TimestampSource::default(),
        };

        let http_timeout = Duration::from_secs(parse_number(&get, "LEDGER_HTTP_TIMEOUT_SECS", 15)?);
        let retry_max_attempts = parse_number(&get, "LEDGER_RETRY_MAX_ATTEMPTS", 5)?;

        Ok(Self {
            bind_addr,
            store,
            loan_status_url: get("LOAN_STATUS_URL"),
            timestamp_source,
            http_timeout,
            retry_max_attempts,
        })
    }
}

fn parse_number<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
