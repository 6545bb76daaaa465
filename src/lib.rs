//! Declarative SQL operations over a pooled `SQLite` database.
//!
//! Templates use either positional (`?`, `?N`) or named (`:name`) placeholders. They are
//! translated once into the driver's numbered syntax, and each call expands list bindings
//! into `IN (...)` placeholders. Operations run on an explicit [`ExecutionContext`], which
//! carries nested transaction scopes so separately declared operations commit or roll back
//! together.
//!
//! ```rust,no_run
//! use sql_ops::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlOpsError> {
//! let pool = ConfigAndPool::new_sqlite(PoolConfig::sqlite("app.sqlite")).await?;
//! let mut ctx = pool.context();
//! ctx.execute_batch("create table if not exists t (id integer primary key, name text, cnt integer)")
//!     .await?;
//!
//! let add = BatchInsert::new("insert into t (name, cnt) values (:name, :cnt)");
//! let bump = Update::new("update t set cnt = cnt + 1 where name in (?)");
//!
//! ctx.transaction(async |ctx: &mut ExecutionContext| {
//!     add.call(ctx, vec![
//!         named_params! { "name" => "a", "cnt" => 1 },
//!         named_params! { "name" => "b", "cnt" => 2 },
//!     ])
//!     .await?;
//!     bump.call(ctx, params![vec!["a", "b"]]).await
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod expand;
mod macros;
pub mod ops;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod sqlite;
pub mod transaction;
pub mod translation;
pub mod types;

pub use config::PoolConfig;
pub use context::{ExecutionContext, TransactionInfo};
pub use error::SqlOpsError;
pub use expand::{ExpandedQuery, expand};
pub use ops::{BatchInsert, Delete, Execute, Insert, Operation, Select, SelectMany, Update};
pub use pool::{ConfigAndPool, ConnectionProvider};
pub use results::{CustomDbRow, ResultSet, Row};
pub use transaction::TxScope;
pub use translation::{PlaceholderStyle, PlanCache, TranslationPlan, translate, translate_cached};
pub use types::{ParamSource, ParamValue, RowShape, RowValues};
