//! The backend API client.

use crate::refresh::{Entry, RefreshOutcome};
use crate::types::{RefreshRequest, RefreshResponse, SignInRequest};
use crate::{
    ApiError, ApiResult, QuickQuoteResource, RateVersionResponse, RefreshGate, RemoteQuoteRef,
    SignInResponse, TokenPair, TokenStore,
};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Overall per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout on the token refresh exchange. An unbounded hang here would
/// stall every request parked behind the gate.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(20);

/// Authenticated client for the quoting backend.
///
/// All state is per-instance: the HTTP pool, the token store, and the
/// refresh gate.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    gate: RefreshGate,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            gate: RefreshGate::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ==========================================
    // Authentication
    // ==========================================

    /// Exchange an externally acquired OAuth access token for backend
    /// credentials. The returned token pair is persisted.
    pub async fn sign_in(&self, external_access_token: &str) -> ApiResult<SignInResponse> {
        let response = self
            .http
            .post(self.url("/api/nfl/sign-in/"))
            .json(&SignInRequest {
                access_token: external_access_token,
            })
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: SignInResponse = response.json().await?;

        self.tokens.save(&TokenPair {
            access: body.access.clone(),
            refresh: body.refresh.clone(),
        })?;
        info!(agent_id = body.agent.id, "Signed in");
        Ok(body)
    }

    /// Run the refresh protocol and return the new access token.
    ///
    /// Exactly one exchange runs at a time; concurrent callers share its
    /// outcome. A rejected refresh clears all stored tokens.
    async fn refresh_access_token(&self) -> ApiResult<String> {
        match self.gate.enter().await {
            Entry::Waiter(rx) => match rx.await {
                Ok(RefreshOutcome::Token(access)) => Ok(access),
                Ok(RefreshOutcome::AuthFailed) => Err(ApiError::AuthRequired),
                Ok(RefreshOutcome::Transient(message)) => Err(ApiError::RefreshFailed { message }),
                // Leader dropped without finishing; treat like a failed refresh
                Err(_) => Err(ApiError::AuthRequired),
            },
            Entry::Leader => {
                let result = self.perform_refresh().await;
                let outcome = match &result {
                    Ok(access) => RefreshOutcome::Token(access.clone()),
                    Err(ApiError::AuthRequired) => RefreshOutcome::AuthFailed,
                    Err(e) => RefreshOutcome::Transient(e.to_string()),
                };
                self.gate.finish(outcome).await;
                result
            }
        }
    }

    /// The actual refresh exchange, run only by the gate leader.
    async fn perform_refresh(&self) -> ApiResult<String> {
        let Some(pair) = self.tokens.load()? else {
            // Nothing to refresh with; force re-authentication.
            self.tokens.clear()?;
            return Err(ApiError::AuthRequired);
        };

        debug!("Refreshing backend tokens");
        let response = self
            .http
            .post(self.url("/api/refresh-tokens/"))
            .timeout(REFRESH_TIMEOUT)
            .json(&RefreshRequest {
                refresh_token: &pair.refresh,
            })
            .send()
            .await
            .map_err(|e| ApiError::RefreshFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::RefreshFailed {
                message: format!("{}: {}", status, message),
            });
        }
        if !status.is_success() {
            // The refresh token itself was rejected (expired or revoked).
            warn!(status = %status, "Token refresh rejected, clearing credentials");
            self.tokens.clear()?;
            return Err(ApiError::AuthRequired);
        }

        let body: RefreshResponse = response.json().await?;
        let updated = TokenPair {
            access: body.access.unwrap_or_else(|| pair.access.clone()),
            refresh: body.refresh.unwrap_or_else(|| pair.refresh.clone()),
        };
        self.tokens.save(&updated)?;
        debug!("Backend tokens refreshed");
        Ok(updated.access)
    }

    /// Send an authorized request, refreshing the token and retrying
    /// exactly once on a 401.
    ///
    /// `build` is invoked per attempt so non-cloneable bodies (multipart)
    /// can be rebuilt for the retry.
    async fn send_authorized<F>(&self, build: F) -> ApiResult<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let Some(pair) = self.tokens.load()? else {
            return Err(ApiError::AuthRequired);
        };

        let response = build(&self.http).bearer_auth(&pair.access).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let access = self.refresh_access_token().await?;
        let retried = build(&self.http).bearer_auth(&access).send().await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            // Fresh token still refused: credentials are unusable.
            self.tokens.clear()?;
            return Err(ApiError::AuthRequired);
        }
        Ok(retried)
    }

    // ==========================================
    // Quick quotes
    // ==========================================

    /// Create a quick quote from a JSON payload.
    pub async fn create_quick_quote(
        &self,
        payload: &serde_json::Value,
    ) -> ApiResult<QuickQuoteResource> {
        let response = self
            .send_authorized(|http| http.post(self.url("/api/quick-quote/")).json(payload))
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Create a quick quote with an attached PDF (multipart form).
    pub async fn create_quick_quote_with_pdf(
        &self,
        payload: &serde_json::Value,
        pdf_bytes: Vec<u8>,
        file_name: &str,
    ) -> ApiResult<QuickQuoteResource> {
        let payload_json = serde_json::to_string(payload)?;
        let response = self
            .send_authorized(|http| {
                let part = reqwest::multipart::Part::bytes(pdf_bytes.clone())
                    .file_name(file_name.to_string());
                let form = reqwest::multipart::Form::new()
                    .text("data", payload_json.clone())
                    .part("pdf", part);
                http.post(self.url("/api/quick-quote/")).multipart(form)
            })
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch the lightweight existence list for deletion detection.
    pub async fn fetch_sync_list(&self) -> ApiResult<Vec<RemoteQuoteRef>> {
        let response = self
            .send_authorized(|http| http.get(self.url("/api/quick-quote/sync/")))
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch one quick quote by its backend id.
    pub async fn get_quick_quote(&self, backend_id: i64) -> ApiResult<QuickQuoteResource> {
        let response = self
            .send_authorized(|http| {
                http.get(self.url(&format!("/api/quick-quote/{}/", backend_id)))
            })
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Delete a quick quote by its backend id. A 404 means the backend
    /// already dropped it, which is success for our purposes.
    pub async fn delete_quick_quote(&self, backend_id: i64) -> ApiResult<()> {
        let response = self
            .send_authorized(|http| {
                http.delete(self.url(&format!("/api/quick-quote/{}/", backend_id)))
            })
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(backend_id, "Quote already absent remotely");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }

    // ==========================================
    // Rates database
    // ==========================================

    /// Latest rates-database version published by the backend.
    pub async fn latest_rate_version(&self) -> ApiResult<i64> {
        let response = self
            .send_authorized(|http| http.get(self.url("/api/version/rate/latest/")))
            .await?;
        let response = check_status(response).await?;
        let body: RateVersionResponse = response.json().await?;
        Ok(body.rate_db_version)
    }

    /// Download the full rates-database snapshot.
    pub async fn download_rate_file(&self) -> ApiResult<Vec<u8>> {
        let response = self
            .send_authorized(|http| http.get(self.url("/api/version/rate/file/")))
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Map a non-2xx response into the error taxonomy. 401 never reaches
/// here on authorized calls; on unauthenticated calls it is a rejection.
async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(ApiError::Rejection {
            status: status.as_u16(),
            message,
        })
    }
}
