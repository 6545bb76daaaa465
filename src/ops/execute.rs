use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::SqlOpsError;
use crate::types::ParamSource;

use super::{Declaration, Operation, prepare};

/// UPDATE/DELETE (or any other DML) returning the affected-row count. Zero rows is not an
/// error.
pub struct Execute<A = ParamSource> {
    decl: Declaration<A, ParamSource>,
}

pub type Update<A = ParamSource> = Execute<A>;
pub type Delete<A = ParamSource> = Execute<A>;

impl Execute<ParamSource> {
    #[must_use]
    pub fn new(sql: &str) -> Self {
        Self::declare(sql, |params| params)
    }
}

impl<A> Execute<A> {
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
impl<A: Send + 'static> Operation<A> for Execute<A> {
    type Output = usize;

    fn template(&self) -> &str {
        self.decl.template()
    }

    async fn call(&self, ctx: &mut ExecutionContext, args: A) -> Result<usize, SqlOpsError> {
        let query = prepare(self.decl.template(), ctx.placeholder_style(), &self.decl.bind(args))?;
        let mut conn = ctx.acquire().await?;
        conn.execute_dml(&query.sql, &query.values).await
    }
}

impl_declared!(Execute { decl });
