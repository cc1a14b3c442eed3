//! Token endpoint client
//!
//! Performs the two form-encoded token operations:
//! - Authorization code exchange (with the PKCE verifier)
//! - Token refresh
//!
//! Exactly one HTTP request per call. Retry policy, if any, belongs to the
//! caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::traits::TokenClientTrait;
use super::types::{OAuthError, TokenRecord, TokenResponse};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for token endpoint operations
#[derive(Debug)]
pub enum OAuthClientError {
    /// HTTP request failed before a response arrived
    RequestFailed(reqwest::Error),

    /// Token endpoint answered with a non-200 status
    Provider {
        status: u16,
        /// RFC 6749 error code, when the body carried one
        error: Option<String>,
        /// `error_description`, or the raw body when it wasn't an OAuth error
        message: String,
    },

    /// Failed to parse a successful response
    ParseError(String),

    /// Refresh was requested with an empty refresh token
    NoRefreshToken,
}

impl OAuthClientError {
    /// Build a provider error from a non-200 response body.
    #[must_use]
    pub fn from_response_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<OAuthError>(body) {
            Ok(oauth) => Self::Provider {
                status,
                message: oauth.error_description.unwrap_or_else(|| oauth.error.clone()),
                error: Some(oauth.error),
            },
            Err(_) => {
                let trimmed = body.trim();
                let message = if trimmed.is_empty() {
                    StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("empty response body")
                        .to_string()
                } else {
                    trimmed.to_string()
                };
                Self::Provider { status, error: None, message }
            }
        }
    }
}

impl std::fmt::Display for OAuthClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed(e) => write!(f, "HTTP request failed: {e}"),
            Self::Provider { status, message, .. } => write!(f, "{message} (HTTP {status})"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::NoRefreshToken => write!(f, "No refresh token available"),
        }
    }
}

impl std::error::Error for OAuthClientError {}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err)
    }
}

/// Client for a single OAuth token endpoint
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: Client,
    token_url: String,
}

impl TokenClient {
    /// Create a client with a 30 second request timeout.
    ///
    /// # Examples
    /// ```
    /// use schemeauth_common::auth::TokenClient;
    ///
    /// let client = TokenClient::new("https://idp.example.com/token");
    /// assert_eq!(client.token_url(), "https://idp.example.com/token");
    /// ```
    #[must_use]
    pub fn new(token_url: impl Into<String>) -> Self {
        let http =
            Client::builder().timeout(HTTP_TIMEOUT).build().unwrap_or_else(|_| Client::new());
        Self::with_http_client(token_url, http)
    }

    /// Create a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(token_url: impl Into<String>, http: Client) -> Self {
        Self { http, token_url: token_url.into() }
    }

    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// Returns error if the request fails, the endpoint answers non-200, or
    /// the response body is not a token response.
    pub async fn exchange(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        verifier: &str,
    ) -> Result<TokenRecord, OAuthClientError> {
        debug!(code_len = code.len(), "token_client.exchange");
        self.post_form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier),
        ])
        .await
    }

    /// Obtain a new access token from a refresh token
    ///
    /// The returned record has no refresh token when the provider omits
    /// one; the caller decides whether to keep the previous value.
    ///
    /// # Errors
    /// Same contract as [`TokenClient::exchange`], plus `NoRefreshToken` for
    /// an empty input.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
    ) -> Result<TokenRecord, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        debug!("token_client.refresh");
        self.post_form(&[
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<TokenRecord, OAuthClientError> {
        let response = self.http.post(&self.token_url).form(params).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "token_client.rejected");
            return Err(OAuthClientError::from_response_body(status.as_u16(), &body));
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| OAuthClientError::ParseError(e.to_string()))?;

        Ok(token_response.into())
    }
}

#[async_trait]
impl TokenClientTrait for TokenClient {
    async fn exchange(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        verifier: &str,
    ) -> Result<TokenRecord, OAuthClientError> {
        Self::exchange(self, code, client_id, redirect_uri, verifier).await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
    ) -> Result<TokenRecord, OAuthClientError> {
        Self::refresh(self, refresh_token, client_id).await
    }
}
