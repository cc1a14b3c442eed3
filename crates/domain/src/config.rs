//! Configuration structures
//!
//! Values are loaded once at the edge (see the infra config loader) and
//! passed explicitly into each component.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTHORIZE_URL, DEFAULT_CAPTURER_APP, DEFAULT_CAPTURE_TIMEOUT_SECS, DEFAULT_SCOPES,
    DEFAULT_TOKEN_URL, HANDSHAKE_DIR_NAME, POLL_INTERVAL_MS, REFRESH_BUFFER_SECS,
    TERMINATE_GRACE_SECS, TOKEN_FILE_NAME,
};
use crate::errors::{AuthError, Result};

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Build a configuration with defaults for everything but the client
    /// registration.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            provider: ProviderConfig::new(client_id, redirect_uri),
            capture: CaptureConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Reject configurations no login attempt could succeed with.
    ///
    /// # Errors
    /// Returns `AuthError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.provider.client_id.trim().is_empty() {
            return Err(AuthError::Config("client_id must not be empty".to_string()));
        }
        match self.provider.scheme() {
            None => {
                return Err(AuthError::Config(format!(
                    "redirect_uri has no URL scheme: {}",
                    self.provider.redirect_uri
                )))
            }
            Some(scheme)
                if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
            {
                return Err(AuthError::Config(format!(
                    "redirect_uri must use a custom scheme, not {scheme}"
                )))
            }
            Some(_) => {}
        }
        if self.capture.timeout_secs == 0 {
            return Err(AuthError::Config("capture timeout must be at least 1 second".to_string()));
        }
        if self.capture.poll_interval_ms == 0 {
            return Err(AuthError::Config("poll interval must be at least 1 ms".to_string()));
        }
        Ok(())
    }
}

/// Identity provider registration and endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    /// Custom-scheme redirect, e.g. `myapp://callback`
    pub redirect_uri: String,
    /// Space-separated scope list
    #[serde(default = "default_scopes")]
    pub scopes: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: default_scopes(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
        }
    }

    /// The URL scheme of the redirect URI (the part before `://`).
    ///
    /// Returns `None` when the redirect URI carries no `://` separator.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.redirect_uri.split_once("://").map(|(scheme, _)| scheme).filter(|s| !s.is_empty())
    }
}

/// Redirect capture settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub grace_period_secs: u64,
    /// Skip automatic capture and prompt for a pasted redirect
    pub force_manual: bool,
    /// Write the OS scheme association before launching the helper (Linux)
    pub register_scheme: bool,
    /// Private directory used for the args/result handshake
    pub handshake_dir: PathBuf,
    /// Directory holding the packaged helper; `None` means next to the binary
    pub capturer_dir: Option<PathBuf>,
    pub capturer_app: String,
    /// Explicit helper executable, bypassing the packaged layout lookup
    pub capturer_executable: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_CAPTURE_TIMEOUT_SECS,
            poll_interval_ms: POLL_INTERVAL_MS,
            grace_period_secs: TERMINATE_GRACE_SECS,
            force_manual: false,
            register_scheme: true,
            handshake_dir: home_path(HANDSHAKE_DIR_NAME),
            capturer_dir: None,
            capturer_app: DEFAULT_CAPTURER_APP.to_string(),
            capturer_executable: None,
        }
    }
}

impl CaptureConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

/// Token persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub token_path: PathBuf,
    /// Seconds before expiry at which a token counts as expiring
    pub refresh_buffer_secs: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { token_path: home_path(TOKEN_FILE_NAME), refresh_buffer_secs: REFRESH_BUFFER_SECS }
    }
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_string()
}

fn default_authorize_url() -> String {
    DEFAULT_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn home_path(name: &str) -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir).join(name)
}
