//! Read-only query execution.
//!
//! Every caller statement runs inside a read-only session on a dedicated
//! pooled connection:
//!
//! 1. acquire a connection
//! 2. mark the session read-only and begin a transaction
//! 3. execute the statement
//! 4. roll back, whether or not the statement succeeded
//! 5. restore the session to read-write
//! 6. release the connection
//!
//! Steps 4-6 run on every path. A connection whose cleanup failed is closed
//! rather than returned, since its session state is no longer known. So is
//! every connection on engines whose rollback leaves session state behind.

use crate::db::adapter::{Conn, DatabaseAdapter};
use crate::db::pool::ConnectionPool;
use crate::error::ServerResult;
use crate::models::QueryOutcome;
use std::time::Instant;
use tracing::{debug, warn};

pub struct ReadOnlyExecutor<A: DatabaseAdapter> {
    pool: ConnectionPool<A>,
}

impl<A: DatabaseAdapter> Clone for ReadOnlyExecutor<A> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<A: DatabaseAdapter> ReadOnlyExecutor<A> {
    pub fn new(pool: ConnectionPool<A>) -> Self {
        Self { pool }
    }

    /// Run `sql` in a read-only transaction that is always rolled back.
    pub async fn run(&self, sql: &str) -> ServerResult<QueryOutcome> {
        let start = Instant::now();
        let adapter = self.pool.adapter();
        debug!(engine = %adapter.kind(), sql = %sql, "Executing read-only query");

        let mut conn = self.pool.acquire().await?;

        let result = match adapter.begin_read_only(&mut conn).await {
            Ok(()) => adapter.execute(&mut conn, sql).await,
            Err(e) => {
                warn!(error = %e, "Failed to enter read-only session");
                Err(e)
            }
        };

        if !self.end_session(&mut conn).await {
            warn!("Discarding connection with unknown session state");
            conn.discard().await;
        } else if !adapter.rollback_resets_session() {
            // Whatever the statement left in the session goes with the connection
            conn.discard().await;
        } else {
            conn.release();
        }

        match &result {
            Ok(outcome) => debug!(
                row_count = outcome.row_count,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query completed"
            ),
            Err(e) => debug!(
                error = %e,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query failed"
            ),
        }

        result
    }

    /// Roll back and restore read-write. Returns `false` if either step
    /// failed; failures are logged and never replace the statement's result.
    async fn end_session(&self, conn: &mut Conn<A::Db>) -> bool {
        let adapter = self.pool.adapter();
        let mut clean = true;

        if let Err(e) = adapter.rollback(conn).await {
            warn!(error = %e, "Rollback after read-only query failed");
            clean = false;
        }
        if let Err(e) = adapter.restore_read_write(conn).await {
            warn!(error = %e, "Failed to restore read-write session");
            clean = false;
        }

        clean
    }
}
