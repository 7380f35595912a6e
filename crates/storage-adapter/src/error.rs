//! Adapter error types.

use thiserror::Error;

/// Adapter error type.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The host environment has no database engine.
    #[error("database access is not implemented for this environment: {environment}")]
    Unsupported { environment: String },

    /// The underlying store failed or is unavailable.
    #[error("storage error: {0}")]
    Storage(#[from] quote_database::DatabaseError),

    /// A row was missing a column or held an unexpected type.
    #[error("column error: {column}: {reason}")]
    Column { column: String, reason: String },
}

impl AdapterError {
    pub(crate) fn column(column: &str, reason: impl Into<String>) -> Self {
        Self::Column {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using AdapterError.
pub type AdapterResult<T> = Result<T, AdapterError>;
