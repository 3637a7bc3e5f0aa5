//! Connection pool management.
//!
//! One bounded sqlx pool per server, typed by the engine adapter. Callers
//! borrow a `PooledConnection`; dropping it (on any path, panics included)
//! hands the connection back to sqlx.

use crate::db::adapter::{Conn, DatabaseAdapter, connection_suggestion};
use crate::error::{ServerError, ServerResult};
use crate::models::{ConnectionSettings, PoolSettings};
use sqlx::pool::{PoolConnection, PoolOptions};
use sqlx::{Connection, Database, Pool};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open connections, idle or borrowed.
    pub size: u32,
    pub idle: usize,
    pub max: u32,
}

impl PoolStatus {
    pub fn in_use(&self) -> usize {
        (self.size as usize).saturating_sub(self.idle)
    }
}

pub struct ConnectionPool<A: DatabaseAdapter> {
    adapter: Arc<A>,
    pool: Pool<A::Db>,
    settings: PoolSettings,
}

impl<A: DatabaseAdapter> Clone for ConnectionPool<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            pool: self.pool.clone(),
            settings: self.settings,
        }
    }
}

impl<A: DatabaseAdapter> std::fmt::Debug for ConnectionPool<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("kind", &self.adapter.kind())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl<A: DatabaseAdapter> ConnectionPool<A> {
    /// Open the pool and verify connectivity with a ping.
    pub async fn connect(adapter: A, settings: &ConnectionSettings) -> ServerResult<Self> {
        let kind = adapter.kind();
        let options = adapter.connect_options(settings)?;

        info!(
            engine = %kind,
            url = %settings.masked_connection_string(),
            max_connections = settings.pool.max_connections,
            "Connecting to database"
        );

        let pool = PoolOptions::<A::Db>::new()
            .max_connections(settings.pool.max_connections)
            .acquire_timeout(settings.pool.acquire_timeout)
            .idle_timeout(settings.pool.idle_timeout)
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(|e| {
                ServerError::connectivity(
                    format!("Failed to connect: {}", e),
                    connection_suggestion(kind, &e),
                )
            })?;

        let this = Self {
            adapter: Arc::new(adapter),
            pool,
            settings: settings.pool,
        };
        this.ping().await?;

        info!(engine = %kind, "Connected successfully");
        Ok(this)
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Borrow a connection, waiting at most `acquire_timeout`.
    pub async fn acquire(&self) -> ServerResult<PooledConnection<A::Db>> {
        match self.pool.acquire().await {
            Ok(conn) => Ok(PooledConnection { inner: conn }),
            Err(sqlx::Error::PoolTimedOut) => {
                let waited_secs = self.settings.acquire_timeout.as_secs();
                warn!(
                    waited_secs,
                    max_connections = self.settings.max_connections,
                    "Connection pool exhausted"
                );
                Err(ServerError::pool_exhausted(waited_secs))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Round-trip to the server on a pooled connection.
    pub async fn ping(&self) -> ServerResult<()> {
        let kind = self.adapter.kind();
        let mut conn = self.acquire().await?;
        conn.ping().await.map_err(|e| {
            ServerError::connectivity(
                format!("Ping failed: {}", e),
                connection_suggestion(kind, &e),
            )
        })?;
        conn.release();
        Ok(())
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.settings.max_connections,
        }
    }

    pub async fn close(&self) {
        info!(engine = %self.adapter.kind(), "Closing connection pool");
        self.pool.close().await;
    }
}

/// A borrowed connection.
///
/// Dropping it returns the connection to the pool. sqlx performs the return
/// on a spawned task, so `status().idle` catches up shortly after the drop.
pub struct PooledConnection<DB: Database> {
    inner: PoolConnection<DB>,
}

impl<DB: Database> PooledConnection<DB> {
    /// Give the connection back to the pool for reuse.
    pub fn release(self) {
        debug!("Connection released");
        drop(self);
    }

    /// Close the connection instead of returning it. The pool opens a
    /// replacement on demand.
    pub async fn discard(self) {
        debug!("Connection discarded");
        if let Err(e) = self.inner.close().await {
            debug!(error = %e, "Error while closing discarded connection");
        }
    }
}

impl<DB: Database> Deref for PooledConnection<DB> {
    type Target = Conn<DB>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<DB: Database> DerefMut for PooledConnection<DB> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
