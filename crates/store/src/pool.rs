//! Bounded pool of SQLite connections.
//!
//! `rusqlite` is synchronous, so every store operation runs on the blocking
//! thread pool. A semaphore caps how many of those operations are in flight
//! at once; idle connections are kept for reuse and opened lazily.
//!
//! ```ignore
//! let pool = StorePool::connect_with_retry(StoreConfig::new("catalog.db"), 5, Duration::from_secs(2)).await?;
//! let count: i64 = pool
//!     .run(|conn| conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0)).map_err(sql_error))
//!     .await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use catalog::{CatalogError, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::error::sql_error;
use crate::schema;

pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the store lives and how connections to it behave
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file, created on first open
    pub path: PathBuf,
    /// Maximum number of simultaneously open connections
    pub pool_size: usize,
    /// How long an operation waits for a free connection
    pub acquire_timeout: Duration,
    /// How long a connection waits on SQLite's write lock
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub size: usize,
    pub idle: usize,
    pub available: usize,
}

/// Shared handle to the connection pool. Cloning is cheap.
#[derive(Clone)]
pub struct StorePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: StoreConfig,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

impl StorePool {
    /// Build a pool without touching the database yet
    pub fn new(config: StoreConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(CatalogError::StoreUnavailable(
                "pool size must be at least 1".to_string(),
            ));
        }
        let permits = Arc::new(Semaphore::new(config.pool_size));
        Ok(Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::with_capacity(config.pool_size)),
                permits,
                config,
            }),
        })
    }

    /// Build a pool and check that the database answers
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let pool = Self::new(config)?;
        pool.ping().await?;
        Ok(pool)
    }

    /// Like [`StorePool::connect`], retrying with a fixed backoff.
    ///
    /// Gives up with the last error after `attempts` failed checks.
    pub async fn connect_with_retry(
        config: StoreConfig,
        attempts: u32,
        backoff: Duration,
    ) -> Result<Self> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match Self::connect(config.clone()).await {
                Ok(pool) => {
                    info!(
                        "Connected to store at {:?} (attempt {}/{})",
                        config.path, attempt, attempts
                    );
                    return Ok(pool);
                }
                Err(err) if attempt < attempts => {
                    warn!(
                        "Store connectivity check failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt, attempts, err, backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run `work` on a pooled connection.
    ///
    /// Waits at most `acquire_timeout` for a free slot, then runs `work` on
    /// the blocking thread pool. The connection goes back to the idle list
    /// afterwards unless it was left inside an open transaction.
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let wait = self.inner.config.acquire_timeout;
        let permit = timeout(wait, self.inner.permits.clone().acquire_owned())
            .await
            .map_err(|_| {
                warn!("Timed out after {:?} waiting for a store connection", wait);
                CatalogError::StoreUnavailable(format!(
                    "timed out after {:?} waiting for a store connection",
                    wait
                ))
            })?
            .map_err(|_| CatalogError::StoreUnavailable("connection pool is closed".to_string()))?;

        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut conn = inner.checkout()?;
            let result = work(&mut conn);
            inner.checkin(conn);
            result
        })
        .await
        .map_err(|e| CatalogError::StoreUnavailable(format!("store task failed: {}", e)))?
    }

    /// Round-trip a trivial query through the pool
    pub async fn ping(&self) -> Result<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(sql_error)?;
            Ok(())
        })
        .await
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.inner.config.pool_size,
            idle: self.inner.idle.lock().len(),
            available: self.inner.permits.available_permits(),
        }
    }

    /// Refuse new work and drop idle connections
    pub fn close(&self) {
        self.inner.permits.close();
        let closed = std::mem::take(&mut *self.inner.idle.lock());
        debug!("Closed store pool, dropped {} idle connections", closed.len());
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }
}

impl PoolInner {
    fn checkout(&self) -> Result<Connection> {
        let idle = self.idle.lock().pop();
        match idle {
            Some(conn) => Ok(conn),
            None => {
                debug!("Opening new store connection to {:?}", self.config.path);
                open_connection(&self.config)
            }
        }
    }

    fn checkin(&self, conn: Connection) {
        if self.permits.is_closed() {
            debug!("Pool closed, dropping returned store connection");
        } else if conn.is_autocommit() {
            self.idle.lock().push(conn);
        } else {
            warn!("Discarding store connection left inside a transaction");
        }
    }
}

fn open_connection(config: &StoreConfig) -> Result<Connection> {
    let conn = Connection::open(&config.path).map_err(sql_error)?;
    conn.busy_timeout(config.busy_timeout).map_err(sql_error)?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(sql_error)?;
    schema::register_functions(&conn).map_err(sql_error)?;
    debug!("Store connection ready (journal_mode={})", mode);
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StoreConfig {
        StoreConfig::new(dir.path().join("pool.db"))
            .with_pool_size(2)
            .with_acquire_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_connect_and_ping() {
        let dir = TempDir::new().unwrap();
        let pool = StorePool::connect(config(&dir)).await.unwrap();

        let status = pool.status();
        assert_eq!(status.size, 2);
        assert_eq!(status.available, 2);
        assert_eq!(status.idle, 1, "the ping connection is kept for reuse");
    }

    #[test]
    fn test_zero_sized_pool_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(StorePool::new(config(&dir).with_pool_size(0)).is_err());
    }

    #[tokio::test]
    async fn test_work_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let pool = StorePool::connect(config(&dir)).await.unwrap();

        let result: Result<()> = pool
            .run(|_| Err(CatalogError::NotFound(3)))
            .await;
        assert_eq!(result, Err(CatalogError::NotFound(3)));
        assert_eq!(pool.status().available, 2, "permit is released on failure");
    }

    #[tokio::test]
    async fn test_acquire_times_out_when_exhausted() {
        let dir = TempDir::new().unwrap();
        let pool = StorePool::connect(config(&dir).with_pool_size(1)).await.unwrap();

        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let busy = pool.clone();
        let holder = tokio::spawn(async move {
            busy.run(move |_| {
                let _ = rx.recv();
                Ok(())
            })
            .await
        });

        // Give the holder time to take the only permit.
        sleep(Duration::from_millis(50)).await;
        let err = pool.ping().await.unwrap_err();
        assert!(matches!(err, CatalogError::StoreUnavailable(_)));

        tx.send(()).unwrap();
        holder.await.unwrap().unwrap();
        pool.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_pool_refuses_work() {
        let dir = TempDir::new().unwrap();
        let pool = StorePool::connect(config(&dir)).await.unwrap();
        pool.close();

        assert!(matches!(
            pool.ping().await,
            Err(CatalogError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_close_drops_connections_in_use() {
        let dir = TempDir::new().unwrap();
        let pool = StorePool::connect(config(&dir)).await.unwrap();

        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let busy = pool.clone();
        let holder = tokio::spawn(async move {
            busy.run(move |_| {
                let _ = rx.recv();
                Ok(())
            })
            .await
        });

        // Let the holder check out the idle connection before closing.
        sleep(Duration::from_millis(50)).await;
        pool.close();
        tx.send(()).unwrap();
        holder.await.unwrap().unwrap();

        assert_eq!(pool.status().idle, 0);
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        let dir = TempDir::new().unwrap();
        let missing = StoreConfig::new(dir.path().join("no/such/dir/catalog.db"));

        let result = StorePool::connect_with_retry(missing, 2, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(CatalogError::StoreUnavailable(_))));
    }
}
