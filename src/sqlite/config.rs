use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::{ManageConnection, Pool, PooledConnection};
use tokio::sync::Mutex;

use crate::error::SqlOpsError;

use super::connection::run_blocking;

/// A `rusqlite` connection shared between the pool and blocking worker tasks.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// A connection checked out of the `SQLite` pool.
pub type SqlitePooledConnection = PooledConnection<'static, SqliteManager>;

/// bb8 manager for `SQLite` connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: String,
    busy_timeout: Duration,
    journal_mode: Option<String>,
}

impl SqliteManager {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(5),
            journal_mode: None,
        }
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Journal mode applied to every new connection. Callers validate the value.
    #[must_use]
    pub fn with_journal_mode(mut self, journal_mode: Option<String>) -> Self {
        self.journal_mode = journal_mode;
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if opening the initial connections fails.
    pub async fn build_pool(
        self,
        max_size: u32,
        connection_timeout: Duration,
    ) -> Result<Pool<SqliteManager>, SqlOpsError> {
        Pool::builder()
            .max_size(max_size)
            .connection_timeout(connection_timeout)
            .build(self)
            .await
    }
}

fn open_connection(
    path: &str,
    busy_timeout: Duration,
    journal_mode: Option<&str>,
) -> Result<SharedSqliteConnection, SqlOpsError> {
    let conn = rusqlite::Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    if let Some(mode) = journal_mode {
        // the pragma answers with the mode actually in effect (`memory` for in-memory dbs)
        let _applied: String =
            conn.query_row(&format!("PRAGMA journal_mode = {mode}"), [], |row| row.get(0))?;
    }
    Ok(Arc::new(Mutex::new(conn)))
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = SqlOpsError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let path = self.path.clone();
        let busy_timeout = self.busy_timeout;
        let journal_mode = self.journal_mode.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                open_connection(&path, busy_timeout, journal_mode.as_deref())
            })
            .await
            .map_err(|e| SqlOpsError::ConnectionError(format!("sqlite open join error: {e}")))?
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            run_blocking(handle, |guard| {
                guard
                    .query_row("SELECT 1", [], |_| Ok(()))
                    .map_err(SqlOpsError::from)
            })
            .await
        }
    }

    /// A connection still inside a transaction, or still locked by a worker, never goes
    /// back into circulation.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        match conn.try_lock() {
            Ok(guard) => !guard.is_autocommit(),
            Err(_) => true,
        }
    }
}
