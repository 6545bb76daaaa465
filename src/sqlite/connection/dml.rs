use crate::error::SqlOpsError;
use crate::expand::ExpandedQuery;
use crate::sqlite::params::Params;
use crate::types::RowValues;

use super::{SqliteConnection, run_blocking};

fn execute_prepared(
    guard: &mut rusqlite::Connection,
    sql: &str,
    params: &Params,
) -> Result<usize, SqlOpsError> {
    let mut stmt = guard.prepare_cached(sql)?;
    Ok(stmt.execute(&params.as_refs()[..])?)
}

impl SqliteConnection {
    /// Execute a batch of statements; wraps in a transaction when not already inside one.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if executing the batch fails.
    pub async fn execute_batch(&mut self, query: &str) -> Result<(), SqlOpsError> {
        let sql_owned = query.to_owned();
        run_blocking(self.conn_handle()?, move |guard| {
            if guard.is_autocommit() {
                let tx = guard.transaction()?;
                tx.execute_batch(&sql_owned)?;
                tx.commit()?;
            } else {
                guard.execute_batch(&sql_owned)?;
            }
            Ok(())
        })
        .await
    }

    /// Execute a DML statement and return rows affected.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if preparing or executing the statement fails.
    pub async fn execute_dml(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<usize, SqlOpsError> {
        let sql_owned = query.to_owned();
        let params = Params::convert(params);
        run_blocking(self.conn_handle()?, move |guard| {
            execute_prepared(guard, &sql_owned, &params)
        })
        .await
    }

    /// Execute an INSERT and return the id of the inserted row.
    ///
    /// The id is read on the same blocking hop as the statement, so no other statement
    /// can interleave on this connection.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if preparing or executing the statement fails.
    pub async fn execute_insert(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<i64, SqlOpsError> {
        let sql_owned = query.to_owned();
        let params = Params::convert(params);
        run_blocking(self.conn_handle()?, move |guard| {
            execute_prepared(guard, &sql_owned, &params)?;
            Ok(guard.last_insert_rowid())
        })
        .await
    }

    /// Execute several expanded statements in order and sum their affected rows.
    ///
    /// Stops at the first failure; transaction handling is the caller's job.
    ///
    /// # Errors
    /// Returns the first `SqlOpsError` raised by any statement.
    pub async fn execute_dml_many(
        &mut self,
        queries: Vec<ExpandedQuery>,
    ) -> Result<usize, SqlOpsError> {
        run_blocking(self.conn_handle()?, move |guard| {
            let mut total = 0usize;
            for query in &queries {
                total += execute_prepared(guard, &query.sql, &Params::convert(&query.values))?;
            }
            Ok(total)
        })
        .await
    }
}
