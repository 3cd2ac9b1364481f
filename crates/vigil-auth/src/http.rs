//! reqwest-backed implementation of [`AuthApi`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use vigil_protocol::{
    ApiErrorBody, AuthenticateRequest, AuthenticateResponse, RefreshRequest,
    RefreshResponse, Session,
};

use crate::{AuthApi, AuthError, LoginOutcome};

/// HTTP client for the auth service.
///
/// Thin by design: encode the request, decode the response, normalize
/// failures into [`AuthError`]. No retries, no token caching, no
/// storage — those concerns belong to the session layer.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Creates a client for the service at `base_url`
    /// (e.g. `https://auth.example.com/api`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest::Client` — for
    /// callers that configure timeouts, proxies, or connection pools
    /// themselves.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    /// POSTs `body` as JSON to `path` and decodes a JSON response.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AuthError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            // Pull the server's message out of the error body when there
            // is one; an empty or non-JSON body still yields a usable error.
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request rejected")
                        .to_string()
                });
            warn!(%url, status = status.as_u16(), %message, "auth request rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| AuthError::Malformed(e.to_string()))
    }
}

impl AuthApi for HttpAuthApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let request = AuthenticateRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthenticateResponse =
            self.post_json("/authenticate", &request).await?;

        let (session, user) = response.into_parts();
        info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutcome { session, user })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let request = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response: RefreshResponse =
            self.post_json("/refresh-token", &request).await?;

        info!(expires_at_ms = response.expiry_time, "token refresh succeeded");
        Ok(response.into())
    }
}
