//! Convenient imports for common functionality.
//!
//! Brings in the operation kinds, the context and pool types, parameter/row types and the
//! `params!`/`named_params!` macros.

pub use crate::config::PoolConfig;
pub use crate::context::{ExecutionContext, TransactionInfo};
pub use crate::error::SqlOpsError;
pub use crate::expand::{ExpandedQuery, expand};
pub use crate::ops::{BatchInsert, Delete, Execute, Insert, Operation, Select, SelectMany, Update};
pub use crate::pool::{ConfigAndPool, ConnectionProvider};
pub use crate::results::{ResultSet, Row};
pub use crate::transaction::TxScope;
pub use crate::translation::{PlaceholderStyle, translate, translate_cached};
pub use crate::types::{ParamSource, ParamValue, RowShape, RowValues};
pub use crate::{named_params, params};
