use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::SqlOpsError;
use crate::results::Row;
use crate::types::{ParamSource, RowShape};

use super::{Declaration, Operation, prepare};

/// Fetch-one query. Returns the first row, or `None` when the query matches nothing.
pub struct Select<A = ParamSource> {
    decl: Declaration<A, ParamSource>,
    shape: RowShape,
}

impl Select<ParamSource> {
    #[must_use]
    pub fn new(sql: &str) -> Self {
        Self::declare(sql, |params| params)
    }
}

impl<A> Select<A> {
    pub fn declare<F>(sql: &str, binder: F) -> Self
    where
        F: Fn(A) -> ParamSource + Send + Sync + 'static,
    {
        Self {
            decl: Declaration::new(sql, binder),
            shape: RowShape::default(),
        }
    }

    #[must_use]
    pub fn with_row_shape(mut self, shape: RowShape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn row_shape(&self) -> RowShape {
        self.shape
    }
}

#[async_trait]
impl<A: Send + 'static> Operation<A> for Select<A> {
    type Output = Option<Row>;

    fn template(&self) -> &str {
        self.decl.template()
    }

    async fn call(&self, ctx: &mut ExecutionContext, args: A) -> Result<Option<Row>, SqlOpsError> {
        let query = prepare(self.decl.template(), ctx.placeholder_style(), &self.decl.bind(args))?;
        let mut conn = ctx.acquire().await?;
        let result_set = conn.execute_select(&query.sql, &query.values, Some(1)).await?;
        Ok(result_set.into_first(self.shape))
    }
}

/// Fetch-many query. Returns every row in result order; no match is an empty `Vec`.
pub struct SelectMany<A = ParamSource> {
    decl: Declaration<A, ParamSource>,
    shape: RowShape,
}

impl SelectMany<ParamSource> {
    #[must_use]
    pub fn new(sql: &str) -> Self {
        Self::declare(sql, |params| params)
    }
}

impl<A> SelectMany<A> {
    pub fn declare<F>(sql: &str, binder: F) -> Self
    where
        F: Fn(A) -> ParamSource + Send + Sync + 'static,
    {
        Self {
            decl: Declaration::new(sql, binder),
            shape: RowShape::default(),
        }
    }

    #[must_use]
    pub fn with_row_shape(mut self, shape: RowShape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn row_shape(&self) -> RowShape {
        self.shape
    }
}

#[async_trait]
impl<A: Send + 'static> Operation<A> for SelectMany<A> {
    type Output = Vec<Row>;

    fn template(&self) -> &str {
        self.decl.template()
    }

    async fn call(&self, ctx: &mut ExecutionContext, args: A) -> Result<Vec<Row>, SqlOpsError> {
        let query = prepare(self.decl.template(), ctx.placeholder_style(), &self.decl.bind(args))?;
        let mut conn = ctx.acquire().await?;
        let result_set = conn.execute_select(&query.sql, &query.values, None).await?;
        Ok(result_set.into_rows(self.shape))
    }
}

impl_declared!(Select { decl, shape });
impl_declared!(SelectMany { decl, shape });
