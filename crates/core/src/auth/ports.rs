//! Port interfaces for redirect capture
//!
//! Two adapters implement [`RedirectCapture`]: the external-process
//! coordinator and the manual paste prompt. The orchestrator picks one per
//! attempt and never inspects which concrete type it holds.

use std::time::Duration;

use async_trait::async_trait;
use schemeauth_domain::Result;

/// How the redirect is obtained for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// External helper owns the URL scheme and reports the redirect
    Automatic,
    /// User pastes the redirect URL back into the terminal
    Manual,
}

impl CaptureStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }
}

/// Input for one capture attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Fully composed provider authorization URL
    pub auth_url: String,
    /// Custom-scheme redirect URI registered with the provider
    pub redirect_uri: String,
    /// Upper bound for the attempt; `None` lets the user set the pace
    pub timeout: Option<Duration>,
}

/// A successful redirect: authorization code plus the returned state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRedirect {
    pub code: String,
    /// Absent when the provider omitted it; treated as a mismatch upstream
    pub state: Option<String>,
}

/// Trait for obtaining the provider redirect
///
/// Failures use the shared taxonomy: provider denials come back as
/// `AuthError::Provider`, timeouts as `AuthError::NoRedirect`.
#[async_trait]
pub trait RedirectCapture: Send + Sync {
    /// Which strategy this adapter implements
    fn strategy(&self) -> CaptureStrategy;

    /// Run one capture attempt
    async fn capture(&self, request: &CaptureRequest) -> Result<CapturedRedirect>;
}
