//! Process configuration, read from the environment at startup.

use std::net::SocketAddr;

use thiserror::Error;

use shoplab_infra::DbConfig;

pub const DEFAULT_DB_PATH: &str = "/data/shop.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not valid: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub db: DbConfig,
    pub bind_addr: SocketAddr,
}

impl ApiConfig {
    /// Read `DB_PATH`, `BIND_ADDR` and `DB_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ApiConfig::from_env`], with variables resolved by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = get("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr.parse().map_err(|e| ConfigError::Invalid {
            var: "BIND_ADDR",
            message: format!("{bind_addr:?}: {e}"),
        })?;

        let max_connections = match get("DB_MAX_CONNECTIONS") {
            None => DbConfig::DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DB_MAX_CONNECTIONS",
                        message: format!("{raw:?} is not a positive integer"),
                    });
                }
            },
        };

        Ok(Self {
            db: DbConfig::file(db_path).with_max_connections(max_connections),
            bind_addr,
        })
    }
}
