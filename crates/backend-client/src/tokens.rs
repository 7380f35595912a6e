//! Token persistence.

use crate::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Access/refresh token pair issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Pluggable token persistence backend.
pub trait TokenStore: Send + Sync {
    /// Load the stored pair, if any.
    fn load(&self) -> ApiResult<Option<TokenPair>>;

    /// Persist a new pair, replacing any previous one.
    fn save(&self, tokens: &TokenPair) -> ApiResult<()>;

    /// Drop all stored tokens (forces re-authentication).
    fn clear(&self) -> ApiResult<()>;
}

/// In-memory store for tests and short-lived clients.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            inner: Mutex::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ApiResult<Option<TokenPair>> {
        Ok(self
            .inner
            .lock()
            .map_err(|_| ApiError::TokenStore("lock poisoned".into()))?
            .clone())
    }

    fn save(&self, tokens: &TokenPair) -> ApiResult<()> {
        *self
            .inner
            .lock()
            .map_err(|_| ApiError::TokenStore("lock poisoned".into()))? = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        *self
            .inner
            .lock()
            .map_err(|_| ApiError::TokenStore("lock poisoned".into()))? = None;
        Ok(())
    }
}

/// JSON-file store used by the desktop daemon.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ApiResult<Option<TokenPair>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ApiError::TokenStore(format!("read {}: {}", self.path.display(), e)))?;
        let tokens = serde_json::from_str(&content)
            .map_err(|e| ApiError::TokenStore(format!("parse {}: {}", self.path.display(), e)))?;
        Ok(Some(tokens))
    }

    fn save(&self, tokens: &TokenPair) -> ApiResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiError::TokenStore(format!("mkdir {}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(tokens)?;
        std::fs::write(&self.path, content)
            .map_err(|e| ApiError::TokenStore(format!("write {}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), "Tokens persisted");
        Ok(())
    }

    fn clear(&self) -> ApiResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                ApiError::TokenStore(format!("remove {}: {}", self.path.display(), e))
            })?;
        }
        debug!(path = %self.path.display(), "Tokens cleared");
        Ok(())
    }
}
