//! Service configuration
//!
//! Everything is read once at startup and stays constant for the process
//! lifetime, including the status-store table and the queue name.

use anyhow::{anyhow, bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::is_sql_identifier;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Local development database.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/stagegate";

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default status-store table.
pub const DEFAULT_JOBS_TABLE: &str = "jobs";

/// Default name of the queue downstream processors consume.
pub const DEFAULT_WORK_QUEUE: &str = "csv-processing";

/// Everything the `stagegate` binary reads at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub triage: TriageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Identifiers of the status store and the work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    pub jobs_table: String,
    pub work_queue: String,
}

/// Value of `name`, or `default` when unset. A set but unparseable value is an error.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}={:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load `.env` (if present), then the environment over the defaults, then validate.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            triage: TriageConfig::from_env()?,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.database.validate()?;
        self.triage.validate()
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: env_or("GATE_HOST", defaults.host)?,
            port: env_or("GATE_PORT", defaults.port)?,
            shutdown_timeout_secs: env_or("GATE_SHUTDOWN_TIMEOUT", defaults.shutdown_timeout_secs)?,
        })
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.port != 0, "GATE_PORT must be greater than 0");
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: env_or("DATABASE_URL", defaults.url)?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_secs: env_or("DATABASE_CONNECT_TIMEOUT", defaults.connect_timeout_secs)?,
        })
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.url.trim().is_empty(), "DATABASE_URL cannot be empty");
        ensure!(self.max_connections > 0, "DATABASE_MAX_CONNECTIONS must be greater than 0");
        ensure!(
            self.min_connections <= self.max_connections,
            "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
            self.min_connections,
            self.max_connections
        );
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl TriageConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            jobs_table: env_or("JOBS_TABLE", defaults.jobs_table)?,
            work_queue: env_or("WORK_QUEUE", defaults.work_queue)?,
        })
    }

    fn validate(&self) -> Result<()> {
        if !is_sql_identifier(&self.jobs_table) {
            bail!("JOBS_TABLE must be a plain SQL identifier, got {:?}", self.jobs_table);
        }
        ensure!(!self.work_queue.trim().is_empty(), "WORK_QUEUE cannot be empty");
        Ok(())
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            jobs_table: DEFAULT_JOBS_TABLE.to_string(),
            work_queue: DEFAULT_WORK_QUEUE.to_string(),
        }
    }
}
