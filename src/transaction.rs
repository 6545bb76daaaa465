//! Nested transaction scopes over an [`ExecutionContext`].
//!
//! The first `begin` on an idle context checks out a connection, issues `BEGIN IMMEDIATE`
//! and hands back the owner token. Further `begin`s only deepen the scope. Only the owner's
//! `commit`/`rollback` reaches the database; a nested rollback marks the transaction
//! rollback-only so the owner's commit turns into a rollback.
//!
//! A token dropped without being handed back (a cancelled future, an early return) is
//! recorded on the transaction. A dropped nested scope makes the transaction rollback-only;
//! a dropped owner scope abandons it, and the context rolls it back before its next use.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::context::{ActiveTx, ExecutionContext};
use crate::error::SqlOpsError;

/// Drop flags shared between a transaction and the scopes handed out for it.
#[derive(Debug, Default)]
pub(crate) struct ScopeSignals {
    owner_dropped: AtomicBool,
    nested_dropped: AtomicUsize,
}

impl ScopeSignals {
    pub(crate) fn owner_dropped(&self) -> bool {
        self.owner_dropped.load(Ordering::Acquire)
    }

    pub(crate) fn nested_dropped(&self) -> usize {
        self.nested_dropped.load(Ordering::Acquire)
    }
}

/// Token returned by [`ExecutionContext::begin`]; hand it back to `commit`, `rollback` or
/// `finish`.
#[must_use = "a transaction scope must be committed or rolled back"]
#[derive(Debug)]
pub struct TxScope {
    owner: bool,
    tx_id: u64,
    signals: Arc<ScopeSignals>,
    settled: bool,
}

impl TxScope {
    /// True for the scope that opened the transaction and decides its outcome.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    #[must_use]
    pub fn transaction_id(&self) -> u64 {
        self.tx_id
    }

    fn new(owner: bool, active: &ActiveTx) -> Self {
        Self {
            owner,
            tx_id: active.id,
            signals: Arc::clone(&active.signals),
            settled: false,
        }
    }
}

impl Drop for TxScope {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if self.owner {
            self.signals.owner_dropped.store(true, Ordering::Release);
        } else {
            self.signals.nested_dropped.fetch_add(1, Ordering::AcqRel);
        }
    }
}

impl ExecutionContext {
    /// Open a transaction scope, joining the open transaction when there is one.
    ///
    /// # Errors
    /// Returns the checkout or `BEGIN` failure; the context stays idle.
    pub async fn begin(&mut self) -> Result<TxScope, SqlOpsError> {
        self.reap_abandoned().await;
        if let Some(active) = self.tx.as_mut() {
            active.depth += 1;
            debug!(tx_id = active.id, depth = active.live_depth(), "joined transaction");
            return Ok(TxScope::new(false, active));
        }

        let mut conn = self.checkout().await?;
        conn.begin().await?;
        let active = ActiveTx {
            conn,
            id: ExecutionContext::allocate_tx_id(),
            depth: 1,
            rollback_only: false,
            signals: Arc::default(),
        };
        debug!(tx_id = active.id, "transaction started");
        let scope = TxScope::new(true, &active);
        self.tx = Some(active);
        Ok(scope)
    }

    /// Close a scope successfully. Only the owner commits.
    ///
    /// # Errors
    /// - `TransactionState` for a token that does not belong to the open transaction.
    /// - `TransactionAborted` when the owner commits a rollback-only transaction, or while
    ///   nested scopes are still open; the transaction is rolled back.
    /// - The driver error if `COMMIT` fails; the transaction is rolled back.
    pub async fn commit(&mut self, mut scope: TxScope) -> Result<(), SqlOpsError> {
        self.reap_abandoned().await;
        let active = self.active_for(&scope)?;
        scope.settled = true;
        if !scope.owner {
            active.depth -= 1;
            debug!(tx_id = active.id, depth = active.live_depth(), "left nested scope");
            return Ok(());
        }

        let abort_reason = if active.rollback_only {
            Some("a nested scope rolled back")
        } else if active.signals.nested_dropped() > 0 {
            Some("a nested scope was dropped before finishing")
        } else if active.live_depth() > 1 {
            Some("nested scopes still open at commit")
        } else {
            None
        };
        let Some(mut active) = self.tx.take() else {
            return Err(missing_tx());
        };

        if let Some(reason) = abort_reason {
            if let Err(err) = active.conn.rollback().await {
                warn!(tx_id = active.id, error = %err, "rollback of aborted transaction failed");
            }
            debug!(tx_id = active.id, reason, "transaction aborted");
            return Err(SqlOpsError::TransactionAborted(reason.to_string()));
        }

        active.conn.commit().await?;
        debug!(tx_id = active.id, "transaction committed");
        Ok(())
    }

    /// Close a scope unsuccessfully. The owner rolls back; a nested scope marks the
    /// transaction rollback-only.
    ///
    /// # Errors
    /// `TransactionState` for a foreign token, or the driver error from `ROLLBACK`.
    pub async fn rollback(&mut self, mut scope: TxScope) -> Result<(), SqlOpsError> {
        self.reap_abandoned().await;
        let active = self.active_for(&scope)?;
        scope.settled = true;
        if !scope.owner {
            active.depth -= 1;
            active.rollback_only = true;
            debug!(tx_id = active.id, depth = active.live_depth(), "nested scope marked rollback-only");
            return Ok(());
        }

        let Some(mut active) = self.tx.take() else {
            return Err(missing_tx());
        };
        active.conn.rollback().await?;
        debug!(tx_id = active.id, "transaction rolled back");
        Ok(())
    }

    /// Commit on `Ok`, roll back on `Err`.
    ///
    /// The body's error comes back unchanged; a rollback failure behind it is only logged.
    ///
    /// # Errors
    /// The body's error, or the commit error on `Ok`.
    pub async fn finish<T, E>(&mut self, scope: TxScope, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<SqlOpsError>,
    {
        match outcome {
            Ok(value) => {
                self.commit(scope).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback(scope).await {
                    warn!(error = %rollback_err, "rollback after failed scope failed");
                }
                Err(err)
            }
        }
    }

    /// Run `body` inside a transaction scope and finish it with the body's outcome.
    ///
    /// ```rust,no_run
    /// use sql_ops::prelude::*;
    ///
    /// # async fn demo(pool: ConfigAndPool) -> Result<(), SqlOpsError> {
    /// let insert = Insert::new("insert into t (name) values (?)");
    /// let mut ctx = pool.context();
    /// ctx.transaction(async |ctx: &mut ExecutionContext| {
    ///     insert.call(ctx, params!["a"]).await?;
    ///     insert.call(ctx, params!["b"]).await
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// As [`ExecutionContext::finish`], plus a `begin` failure.
    pub async fn transaction<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: AsyncFnOnce(&mut ExecutionContext) -> Result<T, E>,
        E: From<SqlOpsError>,
    {
        let scope = self.begin().await?;
        let outcome = body(&mut *self).await;
        self.finish(scope, outcome).await
    }

    /// Roll back a transaction whose owner scope was dropped without finishing.
    pub(crate) async fn reap_abandoned(&mut self) {
        if !self.tx.as_ref().is_some_and(|active| active.signals.owner_dropped()) {
            return;
        }
        let Some(mut active) = self.tx.take() else {
            return;
        };
        warn!(tx_id = active.id, "owner scope dropped before finishing; rolling back");
        if let Err(err) = active.conn.rollback().await {
            warn!(tx_id = active.id, error = %err, "rollback of abandoned transaction failed");
        }
    }

    fn active_for(&mut self, scope: &TxScope) -> Result<&mut ActiveTx, SqlOpsError> {
        match self.tx.as_mut() {
            Some(active) if active.id == scope.tx_id => Ok(active),
            Some(active) => Err(SqlOpsError::TransactionState(format!(
                "scope belongs to transaction {}, open transaction is {}",
                scope.tx_id, active.id
            ))),
            None => Err(missing_tx()),
        }
    }
}

fn missing_tx() -> SqlOpsError {
    SqlOpsError::TransactionState("no transaction is open on this context".into())
}
