//! Configuration error types.

use thiserror::Error;

/// Configuration error type.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured URL does not parse.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// No home directory to anchor the default base dir.
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
