use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::error::SqlOpsError;
use crate::pool::ConnectionProvider;
use crate::sqlite::SqliteConnection;
use crate::transaction::ScopeSignals;
use crate::translation::PlaceholderStyle;

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ActiveTx {
    pub(crate) conn: SqliteConnection,
    pub(crate) id: u64,
    pub(crate) depth: usize,
    pub(crate) rollback_only: bool,
    pub(crate) signals: Arc<ScopeSignals>,
}

impl ActiveTx {
    /// Open scopes, not counting nested ones that were dropped unfinished.
    pub(crate) fn live_depth(&self) -> usize {
        self.depth.saturating_sub(self.signals.nested_dropped())
    }
}

/// Snapshot of the transaction open on a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionInfo {
    pub id: u64,
    /// Number of scopes currently open; 1 means only the owner.
    pub depth: usize,
    /// Set once a nested scope rolled back or was dropped; the owner can then only roll back.
    pub rollback_only: bool,
}

/// Per-task execution state: where connections come from and which transaction, if any,
/// is open.
///
/// A context belongs to one task. Operations take `&mut ExecutionContext`, so two tasks
/// never share transaction state; give each task its own context.
pub struct ExecutionContext {
    provider: Arc<dyn ConnectionProvider>,
    pub(crate) tx: Option<ActiveTx>,
}

/// A connection borrowed for one operation.
///
/// Inside a transaction this is the transaction's connection; otherwise a fresh checkout
/// that goes back to the pool when the lease drops.
pub(crate) enum Lease<'a> {
    Transaction(&'a mut SqliteConnection),
    Standalone(SqliteConnection),
}

impl Deref for Lease<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self {
            Lease::Transaction(conn) => conn,
            Lease::Standalone(conn) => conn,
        }
    }
}

impl DerefMut for Lease<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            Lease::Transaction(conn) => conn,
            Lease::Standalone(conn) => conn,
        }
    }
}

impl ExecutionContext {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            provider,
            tx: None,
        }
    }

    /// False once the owner scope is gone, even before the rollback has run.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.live_tx().is_some()
    }

    /// Open transaction scopes; 0 outside a transaction.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.live_tx().map_or(0, ActiveTx::live_depth)
    }

    #[must_use]
    pub fn current_transaction(&self) -> Option<TransactionInfo> {
        self.live_tx().map(|tx| TransactionInfo {
            id: tx.id,
            depth: tx.live_depth(),
            rollback_only: tx.rollback_only || tx.signals.nested_dropped() > 0,
        })
    }

    fn live_tx(&self) -> Option<&ActiveTx> {
        self.tx.as_ref().filter(|tx| !tx.signals.owner_dropped())
    }

    #[must_use]
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.provider.placeholder_style()
    }

    /// Run a raw SQL script (DDL, seed data). Joins the open transaction if there is one;
    /// otherwise the script runs in its own transaction.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if checkout or execution fails.
    pub async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlOpsError> {
        let mut conn = self.acquire().await?;
        conn.execute_batch(sql).await
    }

    pub(crate) async fn acquire(&mut self) -> Result<Lease<'_>, SqlOpsError> {
        self.reap_abandoned().await;
        match self.tx {
            Some(ref mut active) => Ok(Lease::Transaction(&mut active.conn)),
            None => Ok(Lease::Standalone(self.provider.get_connection().await?)),
        }
    }

    pub(crate) async fn checkout(&self) -> Result<SqliteConnection, SqlOpsError> {
        self.provider.get_connection().await
    }

    /// Unique per process, not per context.
    pub(crate) fn allocate_tx_id() -> u64 {
        NEXT_TX_ID.fetch_add(1, Ordering::Relaxed)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("transaction", &self.current_transaction())
            .finish_non_exhaustive()
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        if let Some(tx) = &self.tx {
            warn!(
                tx_id = tx.id,
                depth = tx.depth,
                "execution context dropped with an open transaction; rolling back"
            );
        }
    }
}
