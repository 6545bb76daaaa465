use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlOpsError {
    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Parameter count mismatch: template expects {expected}, got {actual}")]
    ParameterCountError { expected: usize, actual: usize },

    #[error("Missing parameter: {0}")]
    MissingParameterError(String),

    #[error("Empty collection bound to {0}; an IN-list needs at least one value")]
    EmptyCollectionError(String),

    #[error("Unsafe inline identifier: {0:?}")]
    UnsafeIdentifier(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(#[from] rusqlite::Error),

    #[error("Connection timeout: {0}")]
    ConnectionTimeoutError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Transaction state error: {0}")]
    TransactionState(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlOpsError {
    /// True for failures raised by the database or the pool rather than by a call-time
    /// contract violation.
    #[must_use]
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            SqlOpsError::ExecutionError(_)
                | SqlOpsError::ConnectionTimeoutError(_)
                | SqlOpsError::ConnectionError(_)
        )
    }
}

impl From<bb8::RunError<SqlOpsError>> for SqlOpsError {
    fn from(err: bb8::RunError<SqlOpsError>) -> Self {
        match err {
            bb8::RunError::User(inner) => inner,
            bb8::RunError::TimedOut => {
                SqlOpsError::ConnectionTimeoutError("timed out waiting for a pooled connection".into())
            }
        }
    }
}
