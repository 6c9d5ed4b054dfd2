//! Lazy, single-flight pooled engine
//!
//! The engine is constructed at most once per process, on the first real call
//! to [`LazyPool::get_or_create`] — never at module import and never from a
//! health probe. Concurrent first callers collapse into one construction
//! attempt; everyone waits for the same result.

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::retry::RetryingConnector;
use crate::url::CanonicalUrl;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Fixed parameters applied at engine construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPolicy {
    /// Hard budget: `pool_size + max_overflow`. Chosen conservatively so a
    /// fleet of ephemeral instances cannot exhaust a shared managed
    /// database's global connection ceiling.
    pub max_connections: u32,
    /// Fully lazy: no connections held open before first use.
    pub min_connections: u32,
    /// Checkout timeout; saturation fails in bounded time.
    pub acquire_timeout: Duration,
    /// Connections older than this are replaced, not reused.
    pub recycle: Duration,
    /// Validate each connection with a round trip before handing it out,
    /// transparently replacing dead sockets.
    pub pre_ping: bool,
}

impl PoolPolicy {
    pub fn from_config(config: &DbConfig) -> Self {
        Self {
            max_connections: config.budget(),
            min_connections: 0,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
            recycle: Duration::from_secs(config.pool_recycle_secs),
            pre_ping: true,
        }
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .max_lifetime(self.recycle)
            .test_before_acquire(self.pre_ping)
    }
}

/// One connect attempt: build the pool and verify it with a trivial round
/// trip under the connect timeout. Retrying belongs to the caller.
pub(crate) async fn connect_once(
    canonical: &CanonicalUrl,
    policy: &PoolPolicy,
    config: &DbConfig,
) -> Result<PgPool, sqlx::Error> {
    debug!(
        service = %config.service_name,
        max_connections = policy.max_connections,
        acquire_timeout = ?policy.acquire_timeout,
        recycle = ?policy.recycle,
        "creating database pool"
    );

    let pool = policy.pool_options().connect(&canonical.url).await?;

    match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => Ok(pool),
        Ok(Err(e)) => {
            pool.close().await;
            Err(e)
        }
        Err(_) => {
            pool.close().await;
            Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "database verification timeout",
            )))
        }
    }
}

/// Seam between the lazy cell and the actual connect path. Production uses
/// [`RetryingConnector`]; tests substitute a counting stub.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &DbConfig) -> DbResult<PgPool>;
}

#[async_trait]
impl Connector for RetryingConnector {
    async fn connect(&self, config: &DbConfig) -> DbResult<PgPool> {
        self.connect_with_retry(config).await
    }
}

/// Deferred-construction wrapper around the pooled engine. Owns disposal.
pub struct LazyPool {
    config: DbConfig,
    connector: Arc<dyn Connector>,
    cell: OnceCell<PgPool>,
    disposed: AtomicBool,
}

impl LazyPool {
    /// Wrap `config` with the default retrying connector. No I/O happens
    /// here; the engine is built on first use.
    pub fn new(config: DbConfig) -> Self {
        Self::with_connector(config, Arc::new(RetryingConnector::default()))
    }

    pub fn with_connector(config: DbConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            cell: OnceCell::new(),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Whether the engine has been constructed. Cheap peek for readiness
    /// signals; performs no I/O and triggers no construction.
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Get the engine, constructing it on first call. Concurrent first
    /// callers share a single construction attempt.
    pub async fn get_or_create(&self) -> DbResult<&PgPool> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(shut_down_error());
        }
        let pool = self
            .cell
            .get_or_try_init(|| async {
                info!(service = %self.config.service_name, "first use; constructing database pool");
                self.connector.connect(&self.config).await
            })
            .await?;
        // A dispose() racing the first construction finds the cell still
        // empty and cannot tear anything down; whoever holds the freshly
        // resolved engine re-checks the flag and closes it here, so no pool
        // outlives shutdown. Closing an already-closed pool is a no-op.
        if self.disposed.load(Ordering::SeqCst) {
            pool.close().await;
            info!(
                service = %self.config.service_name,
                "pool construction finished after dispose; engine closed"
            );
            return Err(shut_down_error());
        }
        Ok(pool)
    }

    /// Check a connection out of the pool, constructing the engine first if
    /// needed. Suspends when the budget is saturated and fails once the
    /// acquire timeout elapses.
    pub async fn acquire(&self) -> DbResult<PoolConnection<Postgres>> {
        let pool = self.get_or_create().await?;
        let started = Instant::now();
        pool.acquire().await.map_err(|source| {
            warn!(
                service = %self.config.service_name,
                elapsed = ?started.elapsed(),
                error = %source,
                "connection acquire failed"
            );
            DbError::Transient {
                attempts: 1,
                elapsed: started.elapsed(),
                source,
            }
        })
    }

    /// Explicit startup warm-up: construct the engine and verify one round
    /// trip. The only other place construction happens is first real use.
    pub async fn warm_up(&self) -> DbResult<()> {
        let pool = self.get_or_create().await?;
        let started = Instant::now();
        tokio::time::timeout(
            Duration::from_secs(self.config.connect_timeout_secs),
            sqlx::query("SELECT 1").execute(pool),
        )
        .await
        .map_err(|_| DbError::Transient {
            attempts: 1,
            elapsed: started.elapsed(),
            source: sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "warm-up verification timeout",
            )),
        })?
        .map_err(|source| DbError::Transient {
            attempts: 1,
            elapsed: started.elapsed(),
            source,
        })?;
        Ok(())
    }

    /// Tear down the engine. Idempotent: the first call closes the pool and
    /// waits for teardown; later calls, or a call when the engine was never
    /// constructed, are no-ops. Never blocks or crashes shutdown.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            debug!(service = %self.config.service_name, "dispose called again; ignoring");
            return;
        }
        match self.cell.get() {
            Some(pool) => {
                pool.close().await;
                info!(service = %self.config.service_name, "database pool disposed");
            }
            None => {
                // Either the pool was never used, or a first construction is
                // still in flight; in the latter case the constructing caller
                // sees the disposed flag and closes its engine itself.
                debug!(
                    service = %self.config.service_name,
                    "dispose called before pool construction; nothing to tear down"
                );
            }
        }
    }
}

fn shut_down_error() -> DbError {
    DbError::Transient {
        attempts: 1,
        elapsed: Duration::ZERO,
        source: sqlx::Error::PoolClosed,
    }
}
