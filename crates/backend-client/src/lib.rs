//! Authenticated HTTP client for the quoting backend.
//!
//! Every authorized call attaches the stored bearer token. On a 401 the
//! client performs a single token refresh and retries the original
//! request exactly once; concurrent 401s share one in-flight refresh
//! through [`RefreshGate`] rather than racing their own exchanges.

mod client;
mod error;
mod refresh;
mod tokens;
mod types;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use refresh::RefreshGate;
pub use tokens::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
pub use types::{
    AgentProfile, QuickQuoteResource, RateVersionResponse, RemoteQuoteRef, SignInResponse,
};
