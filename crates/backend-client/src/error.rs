//! API error taxonomy.

use thiserror::Error;

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure: connection refused, DNS, TLS, timeout.
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend returned a 5xx; eligible for retry on a later sync pass.
    #[error("server error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Backend rejected the request (4xx other than 401). Retrying the
    /// same payload cannot succeed without caller intervention.
    #[error("request rejected: {status} - {message}")]
    Rejection { status: u16, message: String },

    /// No usable credentials: 401 after a refresh attempt, a rejected
    /// refresh, or no stored tokens at all. Stored tokens are cleared
    /// before this is returned; re-authentication is the caller's job.
    #[error("authentication required")]
    AuthRequired,

    /// The token refresh call itself failed for a transient reason; the
    /// original request was not retried and credentials were kept.
    #[error("token refresh failed: {message}")]
    RefreshFailed { message: String },

    /// Token persistence failed.
    #[error("token store error: {0}")]
    TokenStore(String),

    /// Payload (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file access failed (PDF uploads, rate snapshots).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Whether a later retry of the same call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Server { .. } | Self::RefreshFailed { .. }
        )
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Server {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(ApiError::RefreshFailed {
            message: "timeout".into()
        }
        .is_transient());

        assert!(!ApiError::Rejection {
            status: 422,
            message: "bad payload".into()
        }
        .is_transient());
        assert!(!ApiError::AuthRequired.is_transient());
        assert!(!ApiError::TokenStore("disk full".into()).is_transient());
    }
}
