//! Login orchestration - core business logic
//!
//! Drives one authentication attempt through
//! `Idle → GeneratingPkce → AwaitingRedirect → ExchangingCode → Persisted`,
//! with `Failed(kind)` reachable from every non-idle state, and serves fresh
//! access tokens with silent refresh.

use std::sync::Arc;
use std::time::Duration;

use schemeauth_common::auth::{
    validate_state, AuthorizationRequest, PkceParameters, TokenClientTrait, TokenRecord,
    TokenStoreTrait,
};
use schemeauth_domain::{AuthError, Config, Result};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::ports::{CaptureRequest, CaptureStrategy, RedirectCapture};
use super::strategy::select_strategy;

/// Observable progress of the current (or last) login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    GeneratingPkce,
    AwaitingRedirect(CaptureStrategy),
    ExchangingCode,
    Persisted,
    /// Carries the failure kind label
    Failed(String),
}

/// Values the orchestrator needs, resolved once at the edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: String,
    pub authorize_url: String,
    /// Bound for the automatic capture; manual capture is user-paced
    pub capture_timeout: Duration,
    pub force_manual: bool,
    /// Result of the environment probe, made by the caller
    pub headless: bool,
    pub refresh_buffer_secs: i64,
}

impl AuthSettings {
    #[must_use]
    pub fn from_config(config: &Config, headless: bool) -> Self {
        Self {
            client_id: config.provider.client_id.clone(),
            redirect_uri: config.provider.redirect_uri.clone(),
            scopes: config.provider.scopes.clone(),
            authorize_url: config.provider.authorize_url.clone(),
            capture_timeout: config.capture.timeout(),
            force_manual: config.capture.force_manual,
            headless,
            refresh_buffer_secs: config.storage.refresh_buffer_secs,
        }
    }
}

/// Top-level authentication service
pub struct AuthOrchestrator<C, S>
where
    C: TokenClientTrait,
    S: TokenStoreTrait,
{
    client: Arc<C>,
    store: Arc<S>,
    automatic: Arc<dyn RedirectCapture>,
    manual: Arc<dyn RedirectCapture>,
    settings: AuthSettings,
    state: RwLock<AuthState>,
}

impl<C, S> AuthOrchestrator<C, S>
where
    C: TokenClientTrait,
    S: TokenStoreTrait,
{
    pub fn new(
        client: Arc<C>,
        store: Arc<S>,
        automatic: Arc<dyn RedirectCapture>,
        manual: Arc<dyn RedirectCapture>,
        settings: AuthSettings,
    ) -> Self {
        Self { client, store, automatic, manual, settings, state: RwLock::new(AuthState::Idle) }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Current state of the login state machine
    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Strategy the next `authenticate` call will use
    pub fn strategy(&self) -> CaptureStrategy {
        select_strategy(self.settings.force_manual, self.settings.headless)
    }

    /// Run a full login: PKCE → URL → capture → state check → exchange →
    /// persist.
    ///
    /// Returns the record as persisted. Capture failures are passed through
    /// unchanged; exchange failures become `TokenExchange`.
    ///
    /// # Errors
    /// Any `AuthError` kind; the state machine ends in `Failed(kind)`.
    pub async fn authenticate(&self) -> Result<TokenRecord> {
        match self.run_login().await {
            Ok(record) => {
                self.transition(AuthState::Persisted).await;
                info!(expires_at = ?record.expires_at, "auth_flow.completed");
                Ok(record)
            }
            Err(err) => {
                self.transition(AuthState::Failed(err.kind().to_string())).await;
                warn!(kind = err.kind(), error = %err, "auth_flow.failed");
                Err(err)
            }
        }
    }

    async fn run_login(&self) -> Result<TokenRecord> {
        let strategy = self.strategy();

        self.transition(AuthState::GeneratingPkce).await;
        let pkce = PkceParameters::generate();
        let auth_url = AuthorizationRequest::new(
            &self.settings.client_id,
            &self.settings.redirect_uri,
            &self.settings.scopes,
            &pkce,
        )
        .to_url(&self.settings.authorize_url)
        .map_err(|e| AuthError::Config(format!("Invalid authorize URL: {e}")))?;

        self.transition(AuthState::AwaitingRedirect(strategy)).await;
        let (capture, timeout) = match strategy {
            CaptureStrategy::Automatic => (&self.automatic, Some(self.settings.capture_timeout)),
            CaptureStrategy::Manual => (&self.manual, None),
        };
        let request = CaptureRequest {
            auth_url: auth_url.to_string(),
            redirect_uri: self.settings.redirect_uri.clone(),
            timeout,
        };
        let captured = capture.capture(&request).await?;

        // CSRF binding applies to both strategies
        let returned_state = captured.state.as_deref().unwrap_or_default();
        if !validate_state(&pkce.state, returned_state) {
            warn!(state_present = captured.state.is_some(), "auth_flow.state_mismatch");
            return Err(AuthError::StateMismatch);
        }

        self.transition(AuthState::ExchangingCode).await;
        let record = self
            .client
            .exchange(
                &captured.code,
                &self.settings.client_id,
                &self.settings.redirect_uri,
                &pkce.verifier,
            )
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        self.store.save(record).await.map_err(|e| AuthError::Storage(e.to_string()))
    }

    /// Return a usable access token, refreshing it first when it expires
    /// within the safety buffer.
    ///
    /// `None` means no token is available: nothing stored, no refresh token,
    /// or the refresh was rejected. The stored record is never deleted here.
    pub async fn get_valid_token(&self, client_id: &str) -> Option<String> {
        self.get_valid_token_at(client_id, chrono::Utc::now().timestamp()).await
    }

    /// [`Self::get_valid_token`] evaluated at a fixed `now` (epoch seconds).
    pub async fn get_valid_token_at(&self, client_id: &str, now: i64) -> Option<String> {
        let record = self.store.load().await?;

        if !record.is_expiring(now, self.settings.refresh_buffer_secs) {
            debug!(remaining = ?record.seconds_until_expiry(now), "token.valid");
            return Some(record.access_token);
        }

        let remaining = record.seconds_until_expiry(now);
        let Some(refresh_token) = record.refresh_token else {
            info!(?remaining, "token.expiring_without_refresh_token");
            return None;
        };

        info!(?remaining, "token.refreshing");
        let mut refreshed = match self.client.refresh(&refresh_token, client_id).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(error = %e, "token.refresh_failed");
                return None;
            }
        };

        refreshed.retain_refresh_token(Some(&refresh_token));
        let access_token = refreshed.access_token.clone();
        if let Err(e) = self.store.save(refreshed).await {
            warn!(error = %e, "token.refresh_not_persisted");
        }
        Some(access_token)
    }

    /// The persisted record, if any, without refreshing it
    pub async fn stored_record(&self) -> Option<TokenRecord> {
        self.store.load().await
    }

    /// Remove persisted tokens; returns whether any were present.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the token file cannot be removed.
    pub async fn logout(&self) -> Result<bool> {
        let cleared = self.store.clear().await.map_err(|e| AuthError::Storage(e.to_string()))?;
        info!(cleared, location = %self.store.location(), "auth.logout");
        Ok(cleared)
    }

    async fn transition(&self, next: AuthState) {
        let mut state = self.state.write().await;
        debug!(from = ?*state, to = ?next, "auth_flow.transition");
        *state = next;
    }
}
