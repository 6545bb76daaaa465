use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::SqlOpsError;

const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Pool configuration.
///
/// Accepts the keys of a typical connection-pool config file. Only `database`, the pool
/// sizing/timeout keys and the `SQLite` pragmas affect an `SQLite` pool; the network keys
/// are accepted so shared config files still parse.
///
/// ```rust
/// use sql_ops::prelude::*;
///
/// let config = PoolConfig::from_toml_str(r#"
/// db = "app.sqlite"
/// pool_size = 3
/// "#)?;
/// assert_eq!(config.database, "app.sqlite");
/// assert_eq!(config.pool_size, 3);
/// # Ok::<(), SqlOpsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Database file path or `file:` URI.
    #[serde(alias = "db")]
    pub database: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    #[serde(alias = "credential")]
    pub password: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub pool_name: Option<String>,
    pub pool_size: u32,
    /// `SQLite` always commits statements run outside a transaction scope; `false` is
    /// accepted and reported as ignored.
    pub autocommit: bool,
    pub driver_mode: Option<String>,
    /// How long a checkout waits for a free connection.
    pub connection_timeout_ms: u64,
    /// How long `SQLite` waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// `PRAGMA journal_mode` applied to each connection; `None` keeps the file's mode.
    pub journal_mode: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            host: None,
            port: None,
            user: None,
            password: None,
            charset: None,
            collation: None,
            pool_name: None,
            pool_size: 5,
            autocommit: true,
            driver_mode: None,
            connection_timeout_ms: 30_000,
            busy_timeout_ms: 5_000,
            journal_mode: Some("WAL".to_string()),
        }
    }
}

impl PoolConfig {
    /// Config for a database path with every other key at its default.
    #[must_use]
    pub fn sqlite(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_journal_mode(mut self, journal_mode: Option<&str>) -> Self {
        self.journal_mode = journal_mode.map(str::to_string);
        self
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns `SqlOpsError::ConfigError` if the document does not parse.
    pub fn from_toml_str(input: &str) -> Result<Self, SqlOpsError> {
        toml::from_str(input).map_err(|e| SqlOpsError::ConfigError(format!("invalid TOML config: {e}")))
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    /// Returns `SqlOpsError::ConfigError` if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SqlOpsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SqlOpsError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build from an in-memory mapping.
    ///
    /// # Errors
    /// Returns `SqlOpsError::ConfigError` if the value is not an object of known keys.
    pub fn from_json_value(value: JsonValue) -> Result<Self, SqlOpsError> {
        serde_json::from_value(value)
            .map_err(|e| SqlOpsError::ConfigError(format!("invalid config mapping: {e}")))
    }

    /// Check the keys a pool cannot start without.
    ///
    /// # Errors
    /// Returns `SqlOpsError::ConfigError` for an empty database, a zero pool size or an
    /// unknown journal mode.
    pub fn validate(&self) -> Result<(), SqlOpsError> {
        if self.database.trim().is_empty() {
            return Err(SqlOpsError::ConfigError("database must not be empty".into()));
        }
        if self.pool_size == 0 {
            return Err(SqlOpsError::ConfigError("pool_size must be at least 1".into()));
        }
        if let Some(mode) = &self.journal_mode {
            if !JOURNAL_MODES.contains(&mode.to_ascii_uppercase().as_str()) {
                return Err(SqlOpsError::ConfigError(format!("unknown journal_mode {mode:?}")));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Keys set in the file that an `SQLite` pool does not use.
    #[must_use]
    pub fn ignored_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.host.is_some() {
            keys.push("host");
        }
        if self.port.is_some() {
            keys.push("port");
        }
        if self.user.is_some() {
            keys.push("user");
        }
        if self.password.is_some() {
            keys.push("password");
        }
        if self.charset.is_some() {
            keys.push("charset");
        }
        if self.collation.is_some() {
            keys.push("collation");
        }
        if !self.autocommit {
            keys.push("autocommit");
        }
        if self.driver_mode.is_some() {
            keys.push("driver_mode");
        }
        keys
    }
}
