//! Shared test helpers for `schemeauth-core` integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use schemeauth_core::{
    parse_redirect, CaptureRequest, CaptureStrategy, CapturedRedirect, RedirectCapture,
};
use schemeauth_domain::{AuthError, Result as DomainResult};
use url::Url;

/// Scripted `RedirectCapture`.
///
/// The scripted redirect may contain `{state}`, replaced with the state the
/// orchestrator put into the authorization URL, so tests can produce both a
/// matching and a forged redirect.
#[derive(Clone)]
pub struct MockCapture {
    strategy: CaptureStrategy,
    redirect: Arc<Mutex<Result<String, AuthError>>>,
    requests: Arc<Mutex<Vec<CaptureRequest>>>,
}

impl MockCapture {
    pub fn new(strategy: CaptureStrategy, redirect: &str) -> Self {
        Self {
            strategy,
            redirect: Arc::new(Mutex::new(Ok(redirect.to_string()))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A capture that fails before any redirect is seen.
    pub fn failing(strategy: CaptureStrategy, error: AuthError) -> Self {
        Self {
            strategy,
            redirect: Arc::new(Mutex::new(Err(error))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Extract a query parameter from the authorization URL.
pub fn query_param(auth_url: &str, name: &str) -> Option<String> {
    Url::parse(auth_url)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl RedirectCapture for MockCapture {
    fn strategy(&self) -> CaptureStrategy {
        self.strategy
    }

    async fn capture(&self, request: &CaptureRequest) -> DomainResult<CapturedRedirect> {
        self.requests.lock().unwrap().push(request.clone());

        let scripted = self.redirect.lock().unwrap().clone()?;
        let state = query_param(&request.auth_url, "state").unwrap_or_default();
        parse_redirect(&scripted.replace("{state}", &state))
    }
}
