//! Wire types for the quoting backend API.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/refresh-tokens/`.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
}

/// Response of `POST /api/refresh-tokens/`. Either half may be omitted,
/// in which case the stored value is kept.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// Body of `POST /api/nfl/sign-in/`: the externally acquired OAuth access
/// token to exchange for backend credentials.
#[derive(Debug, Serialize)]
pub(crate) struct SignInRequest<'a> {
    #[serde(rename = "accessToken")]
    pub access_token: &'a str,
}

/// Backend credentials plus the signed-in agent's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    pub access: String,
    pub refresh: String,
    pub agent: AgentProfile,
}

/// Agent profile as returned by sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: i64,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
}

/// A quick quote as the backend stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickQuoteResource {
    pub id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// One entry of the lightweight existence list from
/// `GET /api/quick-quote/sync/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteQuoteRef {
    pub id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// Response of `GET /api/version/rate/latest/`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateVersionResponse {
    #[serde(rename = "rateDbVersion")]
    pub rate_db_version: i64,
}
