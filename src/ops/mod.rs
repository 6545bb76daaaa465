//! Declared query operations.
//!
//! Each kind pairs a fixed SQL template with a binder that turns call arguments into a
//! [`ParamSource`]. Calling an operation runs translate (memoized), expand, execute and
//! shape against the connection the [`ExecutionContext`] provides.
//!
//! ```rust,no_run
//! use sql_ops::prelude::*;
//!
//! # async fn demo(pool: ConfigAndPool) -> Result<(), SqlOpsError> {
//! let by_name = Select::declare(
//!     "select id, name, cnt from t where name = :name",
//!     |name: &'static str| named_params! { "name" => name },
//! );
//! let mut ctx = pool.context();
//! let row = by_name.call(&mut ctx, "hello").await?;
//! # let _ = row;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::context::ExecutionContext;
use crate::error::SqlOpsError;
use crate::expand::{ExpandedQuery, expand};
use crate::translation::{PlaceholderStyle, translate_cached};
use crate::types::ParamSource;

// Clone/Debug without bounds on the argument type.
macro_rules! impl_declared {
    ($ty:ident { $($field:ident),+ }) => {
        impl<A> Clone for $ty<A> {
            fn clone(&self) -> Self {
                Self { $($field: self.$field.clone()),+ }
            }
        }

        impl<A> std::fmt::Debug for $ty<A> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))+
                    .finish()
            }
        }
    };
}

mod execute;
mod insert;
mod select;

pub use execute::{Delete, Execute, Update};
pub use insert::{BatchInsert, Insert};
pub use select::{Select, SelectMany};

/// The pipeline contract shared by every operation kind.
#[async_trait]
pub trait Operation<A: Send + 'static>: Send + Sync {
    type Output: Send;

    /// SQL template fixed at declaration.
    fn template(&self) -> &str;

    /// Bind `args`, run the statement on the context's connection and shape the result.
    async fn call(&self, ctx: &mut ExecutionContext, args: A) -> Result<Self::Output, SqlOpsError>;
}

type Binder<A, P> = Arc<dyn Fn(A) -> P + Send + Sync>;

/// A template plus the function mapping call arguments to parameters.
pub(crate) struct Declaration<A, P> {
    template: Arc<str>,
    binder: Binder<A, P>,
}

impl<A, P> Declaration<A, P> {
    pub(crate) fn new<F>(template: &str, binder: F) -> Self
    where
        F: Fn(A) -> P + Send + Sync + 'static,
    {
        Self {
            template: Arc::from(template),
            binder: Arc::new(binder),
        }
    }

    pub(crate) fn template(&self) -> &str {
        &self.template
    }

    pub(crate) fn bind(&self, args: A) -> P {
        (self.binder)(args)
    }
}

impl<A, P> Clone for Declaration<A, P> {
    fn clone(&self) -> Self {
        Self {
            template: Arc::clone(&self.template),
            binder: Arc::clone(&self.binder),
        }
    }
}

impl<A, P> fmt::Debug for Declaration<A, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Translate `template` for `style` and bind one parameter source.
pub(crate) fn prepare(
    template: &str,
    style: PlaceholderStyle,
    source: &ParamSource,
) -> Result<ExpandedQuery, SqlOpsError> {
    let plan = translate_cached(template, style)?;
    let expanded = expand(&plan, source)?;
    trace!(sql = %expanded.sql, values = expanded.values.len(), "expanded query");
    Ok(expanded)
}
