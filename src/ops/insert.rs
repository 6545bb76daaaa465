use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::SqlOpsError;
use crate::types::ParamSource;

use super::{Declaration, Operation, prepare};

/// Single-row insert returning the generated row id.
pub struct Insert<A = ParamSource> {
    decl: Declaration<A, ParamSource>,
}

impl Insert<ParamSource> {
    /// Declare an insert called directly with a [`ParamSource`].
    #[must_use]
    pub fn new(sql: &str) -> Self {
        Self::declare(sql, |params| params)
    }
}

impl<A> Insert<A> {
    pub fn declare<F>(sql: &str, binder: F) -> Self
    where
        F: Fn(A) -> ParamSource + Send + Sync + 'static,
    {
        Self {
            decl: Declaration::new(sql, binder),
        }
    }
}

#[async_trait]
impl<A: Send + 'static> Operation<A> for Insert<A> {
    type Output = i64;

    fn template(&self) -> &str {
        self.decl.template()
    }

    async fn call(&self, ctx: &mut ExecutionContext, args: A) -> Result<i64, SqlOpsError> {
        let query = prepare(self.decl.template(), ctx.placeholder_style(), &self.decl.bind(args))?;
        let mut conn = ctx.acquire().await?;
        conn.execute_insert(&query.sql, &query.values).await
    }
}

/// Multi-row insert executed as one unit.
///
/// Runs inside a transaction scope, joining the caller's when one is open. A failing row
/// rolls back every row of the batch. An empty batch returns 0 without touching the
/// database.
pub struct BatchInsert<A = Vec<ParamSource>> {
    decl: Declaration<A, Vec<ParamSource>>,
}

impl BatchInsert<Vec<ParamSource>> {
    /// Declare a batch insert called directly with one [`ParamSource`] per row.
    #[must_use]
    pub fn new(sql: &str) -> Self {
        Self::declare(sql, |rows| rows)
    }
}

impl<A> BatchInsert<A> {
    pub fn declare<F>(sql: &str, binder: F) -> Self
    where
        F: Fn(A) -> Vec<ParamSource> + Send + Sync + 'static,
    {
        Self {
            decl: Declaration::new(sql, binder),
        }
    }
}

#[async_trait]
impl<A: Send + 'static> Operation<A> for BatchInsert<A> {
    type Output = usize;

    fn template(&self) -> &str {
        self.decl.template()
    }

    async fn call(&self, ctx: &mut ExecutionContext, args: A) -> Result<usize, SqlOpsError> {
        let style = ctx.placeholder_style();
        let queries = self
            .decl
            .bind(args)
            .iter()
            .map(|source| prepare(self.decl.template(), style, source))
            .collect::<Result<Vec<_>, _>>()?;
        if queries.is_empty() {
            return Ok(0);
        }

        let scope = ctx.begin().await?;
        let outcome = match ctx.acquire().await {
            Ok(mut conn) => conn.execute_dml_many(queries).await,
            Err(err) => Err(err),
        };
        ctx.finish(scope, outcome).await
    }
}

impl_declared!(Insert { decl });
impl_declared!(BatchInsert { decl });
