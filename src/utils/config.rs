use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use dotenv::dotenv;
use anyhow::{anyhow, Context, Result};

use crate::chunker::CHUNK_SIZE;
use crate::services::ChunkSettings;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 << 20; // 10MB
const DEFAULT_CHUNK_CONCURRENCY: usize = 8;
const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Connection details for the backing PostgreSQL database.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("dbname", &self.dbname)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: u64,
    pub chunks: ChunkSettings,
    pub prometheus_port: Option<u16>,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// The five `POSTGRES_*` variables are required; startup is refused when
    /// any of them is missing or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("environment variable {} is missing", key))
        };

        let database = DatabaseConfig {
            host: required("POSTGRES_HOST")?,
            port: required("POSTGRES_PORT")?
                .parse()
                .context("POSTGRES_PORT is not a valid port")?,
            user: required("POSTGRES_USER")?,
            password: required("POSTGRES_PASSWORD")?,
            dbname: required("POSTGRES_DB")?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
        };

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let max_concurrency: usize = parse_or(&lookup, "CHUNK_CONCURRENCY", DEFAULT_CHUNK_CONCURRENCY)?;
        if max_concurrency == 0 {
            return Err(anyhow!("CHUNK_CONCURRENCY must be at least 1"));
        }
        let timeout_secs: u64 = parse_or(&lookup, "CHUNK_TIMEOUT_SECS", DEFAULT_CHUNK_TIMEOUT_SECS)?;

        let prometheus_port = match lookup("PROMETHEUS_PORT") {
            Some(port) => Some(port.parse().context("PROMETHEUS_PORT is not a valid port")?),
            None => None,
        };

        Ok(Self {
            database,
            bind_addr,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            chunks: ChunkSettings {
                chunk_size: CHUNK_SIZE,
                max_concurrency,
                chunk_timeout: Duration::from_secs(timeout_secs),
            },
            prometheus_port,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value {:?}", key, raw)),
        None => Ok(default),
    }
}
