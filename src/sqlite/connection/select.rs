use crate::error::SqlOpsError;
use crate::results::ResultSet;
use crate::sqlite::params::Params;
use crate::sqlite::query::build_result_set;
use crate::types::RowValues;

use super::{SqliteConnection, run_blocking};

impl SqliteConnection {
    /// Execute a SELECT and materialize up to `limit` rows into a `ResultSet`.
    ///
    /// # Errors
    /// Returns `SqlOpsError` if preparing or executing the query fails.
    pub async fn execute_select(
        &mut self,
        query: &str,
        params: &[RowValues],
        limit: Option<usize>,
    ) -> Result<ResultSet, SqlOpsError> {
        let sql_owned = query.to_owned();
        let params = Params::convert(params);
        run_blocking(self.conn_handle()?, move |guard| {
            let mut stmt = guard.prepare_cached(&sql_owned)?;
            build_result_set(&mut stmt, params.as_values(), limit)
        })
        .await
    }
}
