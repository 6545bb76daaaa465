use std::sync::Arc;

use async_trait::async_trait;
use bb8::Pool;
use tracing::{debug, info};

use crate::config::PoolConfig;
use crate::context::ExecutionContext;
use crate::error::SqlOpsError;
use crate::sqlite::{SqliteConnection, SqliteManager};
use crate::translation::PlaceholderStyle;

/// Source of connections for an [`ExecutionContext`].
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Check out a connection, waiting at most the configured connection timeout.
    async fn get_connection(&self) -> Result<SqliteConnection, SqlOpsError>;

    /// Placeholder syntax templates are translated into.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }
}

/// Configuration and connection pool for a database.
#[derive(Clone)]
pub struct ConfigAndPool {
    /// The connection pool
    pub pool: Pool<SqliteManager>,
    /// The configuration the pool was built from
    pub config: PoolConfig,
}

impl std::fmt::Debug for ConfigAndPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigAndPool")
            .field("database", &self.config.database)
            .field("pool_size", &self.config.pool_size)
            .field("state", &self.pool.state())
            .finish()
    }
}

impl ConfigAndPool {
    /// Build an `SQLite` pool and smoke-test one connection.
    ///
    /// # Errors
    /// Returns `SqlOpsError::ConfigError` for an invalid config, or the connection error
    /// raised while opening the first connection.
    pub async fn new_sqlite(config: PoolConfig) -> Result<Self, SqlOpsError> {
        config.validate()?;
        let ignored = config.ignored_keys();
        if !ignored.is_empty() {
            info!(keys = ?ignored, "config keys not used by sqlite pools");
        }

        let manager = SqliteManager::new(config.database.clone())
            .with_busy_timeout(config.busy_timeout())
            .with_journal_mode(config.journal_mode.clone());
        let pool = manager
            .build_pool(config.pool_size, config.connection_timeout())
            .await?;

        {
            let conn = SqliteConnection::new(pool.get_owned().await?);
            conn.with_connection(|guard| {
                guard.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await?;
        }

        debug!(
            database = %config.database,
            pool_name = config.pool_name.as_deref().unwrap_or("default"),
            pool_size = config.pool_size,
            "sqlite pool ready"
        );
        Ok(Self { pool, config })
    }

    /// Start a fresh execution context drawing from this pool.
    #[must_use]
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(Arc::new(self.clone()))
    }
}

#[async_trait]
impl ConnectionProvider for ConfigAndPool {
    async fn get_connection(&self) -> Result<SqliteConnection, SqlOpsError> {
        let conn = self.pool.get_owned().await?;
        Ok(SqliteConnection::new(conn))
    }
}
