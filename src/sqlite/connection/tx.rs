use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::SqlOpsError;

use super::{SqliteConnection, run_blocking};

const ROLLBACK_BUSY_RETRIES: &[Duration] = &[
    Duration::from_millis(10),
    Duration::from_millis(25),
    Duration::from_millis(50),
];

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::DatabaseBusy
    )
}

/// Issue `ROLLBACK`, retrying a few times while the database reports busy.
///
/// A connection already in autocommit mode has nothing to roll back.
pub(crate) fn rollback_with_busy_retries(
    guard: &mut rusqlite::Connection,
) -> Result<(), SqlOpsError> {
    if guard.is_autocommit() {
        return Ok(());
    }
    for (idx, delay) in ROLLBACK_BUSY_RETRIES.iter().copied().enumerate() {
        match guard.execute_batch("ROLLBACK") {
            Ok(()) => return Ok(()),
            Err(err) if is_busy(&err) && idx + 1 < ROLLBACK_BUSY_RETRIES.len() => {
                thread::sleep(delay);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(SqlOpsError::Other("rollback retries exhausted".into()))
}

impl SqliteConnection {
    /// Begin a transaction, transitioning this connection into transactional mode.
    ///
    /// Issues `BEGIN IMMEDIATE`; the database write lock is held from here on.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if the transaction cannot be started or is already active.
    pub async fn begin(&mut self) -> Result<(), SqlOpsError> {
        if self.in_transaction {
            return Err(SqlOpsError::TransactionState(
                "SQLite transaction already in progress".into(),
            ));
        }
        run_blocking(self.conn_handle()?, move |guard| {
            guard.execute_batch("BEGIN IMMEDIATE")?;
            Ok(())
        })
        .await?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit an open transaction.
    ///
    /// On failure the transaction is rolled back before the error is returned.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if committing fails or no transaction is active.
    pub async fn commit(&mut self) -> Result<(), SqlOpsError> {
        if !self.in_transaction {
            return Err(SqlOpsError::TransactionState(
                "SQLite transaction not active".into(),
            ));
        }
        let result = run_blocking(self.conn_handle()?, move |guard| {
            match guard.execute_batch("COMMIT") {
                Ok(()) => Ok(()),
                Err(err) => {
                    if let Err(rollback_err) = rollback_with_busy_retries(guard) {
                        warn!(error = %rollback_err, "rollback after failed commit failed");
                    }
                    Err(SqlOpsError::from(err))
                }
            }
        })
        .await;
        self.in_transaction = false;
        result
    }

    /// Roll back an open transaction.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if rolling back fails or no transaction is active.
    pub async fn rollback(&mut self) -> Result<(), SqlOpsError> {
        if !self.in_transaction {
            return Err(SqlOpsError::TransactionState(
                "SQLite transaction not active".into(),
            ));
        }
        let result = run_blocking(self.conn_handle()?, rollback_with_busy_retries).await;
        self.in_transaction = false;
        result
    }
}
