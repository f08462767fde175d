//! Store configuration loading and representation.

use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite://railshop.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for the relational store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite connection URL (`RAILSHOP_DATABASE_URL`).
    pub database_url: String,
    /// Pool size cap (`RAILSHOP_DB_MAX_CONNECTIONS`).
    pub max_connections: u32,
}

impl StoreConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let database_url = env::var("RAILSHOP_DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let max_connections = env::var("RAILSHOP_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        Self {
            database_url,
            max_connections,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}
