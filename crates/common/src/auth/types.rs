//! OAuth 2.0 token types
//!
//! `TokenRecord` is the persisted shape; `TokenResponse` is what the token
//! endpoint returns. Expiry bookkeeping uses epoch seconds so the file stays
//! readable by other tooling.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys computed locally at save time; never accepted from a provider body.
const COMPUTED_KEYS: [&str; 2] = ["saved_at", "expires_at"];

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Persisted access/refresh tokens with expiry metadata
///
/// Fields the provider returns beyond the standard set are kept in `extra`
/// and written back verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,

    /// Optional because some providers don't issue refresh tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Access token lifetime in seconds, as returned by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Epoch seconds of the last save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,

    /// Epoch seconds; `saved_at + expires_in`, computed at save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenRecord {
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_in: Option<i64>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: default_token_type(),
            expires_in,
            saved_at: None,
            expires_at: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Stamp `saved_at` and recompute `expires_at` from `expires_in`.
    ///
    /// A record without `expires_in` ends up without `expires_at`; a value
    /// left over from an earlier save is never carried forward.
    pub fn stamp(&mut self, now: i64) {
        self.saved_at = Some(now);
        self.expires_at = self.expires_in.map(|lifetime| now.saturating_add(lifetime));
    }

    /// Seconds until expiry, negative once expired.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: i64) -> Option<i64> {
        self.expires_at.map(|expires_at| expires_at - now)
    }

    /// Whether the token expires within `buffer_secs` of `now`.
    ///
    /// Records without an expiry timestamp count as expiring.
    #[must_use]
    pub fn is_expiring(&self, now: i64, buffer_secs: i64) -> bool {
        self.seconds_until_expiry(now).map_or(true, |remaining| remaining < buffer_secs)
    }

    /// Keep `previous` as the refresh token when this record carries none.
    pub fn retain_refresh_token(&mut self, previous: Option<&str>) {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.map(str::to_string);
        }
    }
}

/// OAuth token response from the authorization server (RFC 6749 §5.1)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<TokenResponse> for TokenRecord {
    fn from(response: TokenResponse) -> Self {
        let mut extra = response.extra;
        for key in COMPUTED_KEYS {
            extra.remove(key);
        }

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            saved_at: None,
            expires_at: None,
            extra,
        }
    }
}

/// OAuth error response (RFC 6749 §5.2)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}
