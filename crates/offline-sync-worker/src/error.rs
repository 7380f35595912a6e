//! Sync error types.

use backend_client::ApiError;
use quote_services::ServiceError;
use thiserror::Error;

/// Sync error type.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Local queue/store operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Remote call failed in a way that ends the pass.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Credentials are unusable; the pass aborted. The embedding app must
    /// re-authenticate before syncing can resume.
    #[error("sync aborted: authentication required")]
    AuthRequired,

    /// Local file access failed (reading a queued PDF, writing the rates
    /// snapshot).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
