use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::SqlOpsError;
use crate::sqlite::config::{SharedSqliteConnection, SqlitePooledConnection};

use super::tx::rollback_with_busy_retries;

/// Connection wrapper backed by a bb8 pooled `SQLite` connection.
///
/// Dropping a wrapper whose transaction is still open rolls it back before the
/// connection returns to the pool. Inside a runtime the rollback runs on a spawned task.
pub struct SqliteConnection {
    pub(crate) conn: Option<SqlitePooledConnection>,
    pub(crate) in_transaction: bool,
}

impl SqliteConnection {
    pub(crate) fn new(conn: SqlitePooledConnection) -> Self {
        Self {
            conn: Some(conn),
            in_transaction: false,
        }
    }

    /// Whether `begin` has been issued without a matching `commit`/`rollback`.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Run a closure against the raw `rusqlite` connection on the blocking pool.
    ///
    /// # Errors
    /// Returns whatever the closure returns, or `SqlOpsError::ConnectionError` if the
    /// blocking task panics.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, SqlOpsError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlOpsError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(self.conn_handle()?, func).await
    }

    pub(crate) fn conn_handle(&self) -> Result<SharedSqliteConnection, SqlOpsError> {
        self.conn
            .as_ref()
            .map(|conn| Arc::clone(&**conn))
            .ok_or_else(|| SqlOpsError::ConnectionError("sqlite connection already released".into()))
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if !self.in_transaction {
            return;
        }
        self.in_transaction = false;
        let Some(conn) = self.conn.take() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            // the pooled connection is held until the rollback lands
            handle.spawn(async move {
                let shared = Arc::clone(&*conn);
                match run_blocking(shared, rollback_with_busy_retries).await {
                    Ok(()) => warn!("open sqlite transaction rolled back on drop"),
                    Err(err) => warn!(error = %err, "rollback on drop failed"),
                }
                drop(conn);
            });
            return;
        }
        let Ok(mut guard) = conn.try_lock() else {
            // the pool's broken-connection check discards it instead
            warn!("sqlite connection busy at drop; open transaction left to the pool");
            return;
        };
        match rollback_with_busy_retries(&mut guard) {
            Ok(()) => warn!("open sqlite transaction rolled back on drop"),
            Err(err) => warn!(error = %err, "rollback on drop failed"),
        }
    }
}

pub(crate) async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, SqlOpsError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlOpsError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlOpsError::ConnectionError(format!("sqlite spawn_blocking join error: {e}")))?
}
