//! Command-line and environment configuration for the catalog server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use store::StoreConfig;

/// Reel Catalog - movie catalog and rating service
#[derive(Debug, Clone, Parser)]
#[command(name = "reel-catalog-server")]
#[command(about = "HTTP API for the movie catalog and its rating aggregator", long_about = None)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite database file, created if missing
    #[arg(long, env = "CATALOG_DB_PATH", default_value = "catalog.db")]
    pub db_path: PathBuf,

    /// Maximum number of concurrent store connections
    #[arg(long, env = "CATALOG_DB_POOL_SIZE", default_value_t = 10)]
    pub pool_size: usize,

    /// How long a request waits for a free store connection
    #[arg(long, env = "CATALOG_DB_ACQUIRE_TIMEOUT_MS", default_value_t = 5000)]
    pub acquire_timeout_ms: u64,

    /// How long a store connection waits on the database write lock
    #[arg(long, env = "CATALOG_DB_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Connectivity checks attempted at startup before giving up
    #[arg(long, env = "CATALOG_DB_CONNECT_RETRIES", default_value_t = 5)]
    pub connect_retries: u32,

    /// Delay between startup connectivity checks
    #[arg(long, env = "CATALOG_DB_CONNECT_BACKOFF_MS", default_value_t = 2000)]
    pub connect_backoff_ms: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.db_path)
            .with_pool_size(self.pool_size)
            .with_acquire_timeout(Duration::from_millis(self.acquire_timeout_ms))
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["reel-catalog-server"]).unwrap();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.connect_retries, 5);
        assert_eq!(config.db_path, PathBuf::from("catalog.db"));
        assert_eq!(config.connect_backoff(), Duration::from_secs(2));
    }

    #[test]
    fn test_store_config_conversion() {
        let config = ServerConfig::try_parse_from([
            "reel-catalog-server",
            "--db-path",
            "/tmp/movies.db",
            "--pool-size",
            "3",
            "--acquire-timeout-ms",
            "250",
        ])
        .unwrap();

        let store = config.store_config();
        assert_eq!(store.path, PathBuf::from("/tmp/movies.db"));
        assert_eq!(store.pool_size, 3);
        assert_eq!(store.acquire_timeout, Duration::from_millis(250));
        assert_eq!(store.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bind_address() {
        let config =
            ServerConfig::try_parse_from(["reel-catalog-server", "--host", "127.0.0.1", "--port", "8080"])
                .unwrap();
        assert_eq!(config.bind_address().unwrap(), "127.0.0.1:8080".parse().unwrap());

        let config = ServerConfig::try_parse_from(["reel-catalog-server", "--host", "not a host"]).unwrap();
        assert!(config.bind_address().is_err());
    }
}
