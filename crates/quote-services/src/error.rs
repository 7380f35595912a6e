//! Service error types.

use quote_database::TransitionError;
use storage_adapter::AdapterError;
use thiserror::Error;

/// Service error type.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Caller omitted a required field; never retried automatically.
    #[error("validation error: {0}")]
    Validation(String),

    /// The local store failed or is unavailable on this host.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The delivery state machine rejected a status write.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A backend id is already assigned and cannot change.
    #[error("backend id conflict on item {id}: already {existing}, refused {requested}")]
    BackendIdConflict {
        id: i64,
        existing: i64,
        requested: i64,
    },

    /// Request payload could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ServiceError.
pub type ServiceResult<T> = Result<T, ServiceError>;
