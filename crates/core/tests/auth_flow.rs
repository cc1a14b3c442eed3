//! Integration tests for the login state machine and token lifecycle
//!
//! Wires `AuthOrchestrator` to scripted capture adapters and the in-memory
//! token client/store from `schemeauth_common::testing`.

mod support;

use std::sync::Arc;
use std::time::Duration;

use schemeauth_common::auth::TokenRecord;
use schemeauth_common::testing::{MockTokenClient, MockTokenStore};
use schemeauth_core::{AuthOrchestrator, AuthSettings, AuthState, CaptureStrategy};
use schemeauth_domain::AuthError;
use support::{query_param, MockCapture};

const NOW: i64 = 1_700_000_000;

fn settings() -> AuthSettings {
    AuthSettings {
        client_id: "cid".into(),
        redirect_uri: "scheme://cb".into(),
        scopes: "email profile openid offline_access".into(),
        authorize_url: "https://idp.example.com/authorize".into(),
        capture_timeout: Duration::from_secs(120),
        force_manual: false,
        headless: false,
        refresh_buffer_secs: 300,
    }
}

struct Harness {
    orchestrator: AuthOrchestrator<MockTokenClient, MockTokenStore>,
    client: MockTokenClient,
    store: MockTokenStore,
    automatic: MockCapture,
    manual: MockCapture,
}

fn harness(automatic: MockCapture, manual: MockCapture, settings: AuthSettings) -> Harness {
    let client = MockTokenClient::new();
    let store = MockTokenStore::new();
    store.set_now(NOW);
    let orchestrator = AuthOrchestrator::new(
        Arc::new(client.clone()),
        Arc::new(store.clone()),
        Arc::new(automatic.clone()),
        Arc::new(manual.clone()),
        settings,
    );
    Harness { orchestrator, client, store, automatic, manual }
}

fn automatic(redirect: &str) -> MockCapture {
    MockCapture::new(CaptureStrategy::Automatic, redirect)
}

fn manual(redirect: &str) -> MockCapture {
    MockCapture::new(CaptureStrategy::Manual, redirect)
}

/// Validates the end-to-end success path.
///
/// # Test Steps
/// 1. Automatic capture returns `code=abc123` with the generated state
/// 2. Token endpoint returns AT/RT with a 3600 s lifetime
/// 3. Verify the exchange used the code, client and PKCE verifier
/// 4. Verify the record is persisted with `expires_at = saved_at + 3600`
#[tokio::test]
async fn test_successful_login_persists_tokens() {
    let h = harness(automatic("scheme://cb?code=abc123&state={state}"), manual(""), settings());
    h.client.set_exchange_response(
        TokenRecord::new("AT", Some(3600)).with_refresh_token("RT"),
    );

    let record = h.orchestrator.authenticate().await.expect("login should succeed");

    let calls = h.client.exchange_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].code, "abc123");
    assert_eq!(calls[0].client_id, "cid");
    assert_eq!(calls[0].redirect_uri, "scheme://cb");
    assert!(calls[0].verifier.len() >= 43);

    assert_eq!(record.access_token, "AT");
    assert_eq!(record.saved_at, Some(NOW));
    assert_eq!(record.expires_at, Some(NOW + 3600));
    assert_eq!(h.store.current(), Some(record));
    assert_eq!(h.orchestrator.state().await, AuthState::Persisted);
}

/// The verifier sent to the token endpoint hashes to the challenge in the
/// authorization URL.
#[tokio::test]
async fn test_exchange_verifier_matches_url_challenge() {
    let h = harness(automatic("scheme://cb?code=c&state={state}"), manual(""), settings());

    h.orchestrator.authenticate().await.unwrap();

    let request = &h.automatic.requests()[0];
    let challenge = query_param(&request.auth_url, "code_challenge").unwrap();
    let verifier = &h.client.exchange_calls()[0].verifier;
    assert_eq!(schemeauth_common::auth::generate_challenge(verifier), challenge);
    assert_eq!(query_param(&request.auth_url, "code_challenge_method").as_deref(), Some("S256"));
    assert_eq!(request.redirect_uri, "scheme://cb");
}

/// Validates CSRF binding on the automatic path.
///
/// # Test Steps
/// 1. Capture returns a redirect with a forged state
/// 2. Verify `state_mismatch` and that no exchange or save happened
#[tokio::test]
async fn test_state_mismatch_blocks_exchange() {
    let h = harness(automatic("scheme://cb?code=abc&state=FORGED"), manual(""), settings());

    let err = h.orchestrator.authenticate().await.unwrap_err();

    assert_eq!(err, AuthError::StateMismatch);
    assert!(h.client.exchange_calls().is_empty());
    assert_eq!(h.store.save_count(), 0);
    assert_eq!(h.orchestrator.state().await, AuthState::Failed("state_mismatch".into()));
}

#[tokio::test]
async fn test_missing_state_is_a_mismatch() {
    let h = harness(automatic("scheme://cb?code=abc"), manual(""), settings());

    let err = h.orchestrator.authenticate().await.unwrap_err();

    assert_eq!(err, AuthError::StateMismatch);
    assert!(h.client.exchange_calls().is_empty());
}

/// CSRF binding applies identically on the manual path.
#[tokio::test]
async fn test_state_mismatch_on_manual_path() {
    let mut s = settings();
    s.force_manual = true;
    let h = harness(automatic(""), manual("scheme://cb?code=abc&state=OTHER"), s);

    let err = h.orchestrator.authenticate().await.unwrap_err();

    assert_eq!(err.kind(), "state_mismatch");
    assert!(h.automatic.requests().is_empty());
    assert!(h.client.exchange_calls().is_empty());
}

/// Validates a provider denial is surfaced with the provider's own kind.
#[tokio::test]
async fn test_provider_denial_skips_token_endpoint() {
    let h = harness(
        automatic("scheme://cb?error=access_denied&error_description=User+declined"),
        manual(""),
        settings(),
    );

    let err = h.orchestrator.authenticate().await.unwrap_err();

    assert_eq!(err.kind(), "access_denied");
    assert_eq!(err.description(), "User declined");
    assert!(h.client.exchange_calls().is_empty());
    assert_eq!(h.orchestrator.state().await, AuthState::Failed("access_denied".into()));
}

/// Capture failures propagate unchanged.
#[tokio::test]
async fn test_capture_failure_kind_is_preserved() {
    let h = harness(
        MockCapture::failing(
            CaptureStrategy::Automatic,
            AuthError::NoRedirect("Did not receive redirect within timeout".into()),
        ),
        manual(""),
        settings(),
    );

    let err = h.orchestrator.authenticate().await.unwrap_err();

    assert_eq!(err, AuthError::NoRedirect("Did not receive redirect within timeout".into()));
}

#[tokio::test]
async fn test_exchange_failure_is_token_exchange() {
    let h = harness(automatic("scheme://cb?code=abc&state={state}"), manual(""), settings());
    h.client.fail_exchange("Authorization code expired");

    let err = h.orchestrator.authenticate().await.unwrap_err();

    assert_eq!(err.kind(), "token_exchange");
    assert!(err.description().contains("Authorization code expired"));
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_storage_failure_after_exchange() {
    let h = harness(automatic("scheme://cb?code=abc&state={state}"), manual(""), settings());
    h.store.set_fail_saves(true);

    let err = h.orchestrator.authenticate().await.unwrap_err();

    assert_eq!(err.kind(), "storage_error");
}

/// Validates strategy selection and per-strategy timeouts.
///
/// # Test Steps
/// 1. Interactive session: automatic capture receives the configured bound
/// 2. Headless session: manual capture receives no bound
#[tokio::test]
async fn test_strategy_selection_and_timeouts() {
    let h = harness(automatic("scheme://cb?code=a&state={state}"), manual(""), settings());
    assert_eq!(h.orchestrator.strategy(), CaptureStrategy::Automatic);
    h.orchestrator.authenticate().await.unwrap();
    assert_eq!(h.automatic.requests()[0].timeout, Some(Duration::from_secs(120)));

    let mut s = settings();
    s.headless = true;
    let h = harness(automatic(""), manual("scheme://cb?code=m&state={state}"), s);
    assert_eq!(h.orchestrator.strategy(), CaptureStrategy::Manual);
    h.orchestrator.authenticate().await.unwrap();
    assert!(h.automatic.requests().is_empty());
    assert_eq!(h.manual.requests()[0].timeout, None);
    assert_eq!(h.client.exchange_calls()[0].code, "m");
}

#[tokio::test]
async fn test_invalid_authorize_url_is_config_error() {
    let mut s = settings();
    s.authorize_url = "not a url".into();
    let h = harness(automatic(""), manual(""), s);

    let err = h.orchestrator.authenticate().await.unwrap_err();

    assert_eq!(err.kind(), "config_error");
    assert!(h.automatic.requests().is_empty());
}

#[tokio::test]
async fn test_state_starts_idle() {
    let h = harness(automatic(""), manual(""), settings());
    assert_eq!(h.orchestrator.state().await, AuthState::Idle);
}

fn stored(expires_in_from_now: i64, refresh_token: Option<&str>) -> TokenRecord {
    let mut record = TokenRecord::new("OLD_AT", Some(3600));
    record.refresh_token = refresh_token.map(str::to_string);
    record.saved_at = Some(NOW - 3000);
    record.expires_at = Some(NOW + expires_in_from_now);
    record
}

#[tokio::test]
async fn test_valid_token_outside_buffer_is_returned_as_is() {
    let h = harness(automatic(""), manual(""), settings());
    h.store.seed(stored(400, Some("RT1")));

    let token = h.orchestrator.get_valid_token_at("cid", NOW).await;

    assert_eq!(token.as_deref(), Some("OLD_AT"));
    assert!(h.client.refresh_calls().is_empty());
}

/// Validates refresh inside the buffer with refresh-token retention.
///
/// # Test Steps
/// 1. Stored record expires in 200 s (inside the 300 s buffer)
/// 2. Refresh response omits `refresh_token`
/// 3. Verify the new access token is returned and persisted with RT1 kept
#[tokio::test]
async fn test_expiring_token_is_refreshed_and_refresh_token_retained() {
    let h = harness(automatic(""), manual(""), settings());
    h.store.seed(stored(200, Some("RT1")));
    h.client.set_refresh_response(TokenRecord::new("NEW_AT", Some(1800)));

    let token = h.orchestrator.get_valid_token_at("cid", NOW).await;

    assert_eq!(token.as_deref(), Some("NEW_AT"));
    assert_eq!(h.client.refresh_calls(), vec!["RT1".to_string()]);
    let persisted = h.store.current().unwrap();
    assert_eq!(persisted.access_token, "NEW_AT");
    assert_eq!(persisted.refresh_token.as_deref(), Some("RT1"));
    assert_eq!(persisted.expires_at, Some(NOW + 1800));
}

#[tokio::test]
async fn test_rotated_refresh_token_replaces_old_one() {
    let h = harness(automatic(""), manual(""), settings());
    h.store.seed(stored(-10, Some("RT1")));
    h.client.set_refresh_response(TokenRecord::new("NEW_AT", Some(1800)).with_refresh_token("RT2"));

    h.orchestrator.get_valid_token_at("cid", NOW).await.unwrap();

    assert_eq!(h.store.current().unwrap().refresh_token.as_deref(), Some("RT2"));
}

/// A rejected refresh yields no token and leaves the stale record in place.
#[tokio::test]
async fn test_failed_refresh_keeps_stale_record() {
    let h = harness(automatic(""), manual(""), settings());
    let stale = stored(100, Some("RT1"));
    h.store.seed(stale.clone());
    h.client.fail_refresh("invalid_grant");

    let token = h.orchestrator.get_valid_token_at("cid", NOW).await;

    assert_eq!(token, None);
    assert_eq!(h.store.current(), Some(stale));
    assert_eq!(h.store.save_count(), 0);
}

#[tokio::test]
async fn test_expiring_without_refresh_token_yields_none() {
    let h = harness(automatic(""), manual(""), settings());
    h.store.seed(stored(100, None));

    assert_eq!(h.orchestrator.get_valid_token_at("cid", NOW).await, None);
    assert!(h.client.refresh_calls().is_empty());
}

#[tokio::test]
async fn test_record_without_expiry_is_refreshed() {
    let h = harness(automatic(""), manual(""), settings());
    let mut record = TokenRecord::new("OLD_AT", None).with_refresh_token("RT1");
    record.saved_at = Some(NOW);
    h.store.seed(record);

    let token = h.orchestrator.get_valid_token_at("cid", NOW).await;

    assert_eq!(token.as_deref(), Some("refreshed_access_token"));
}

#[tokio::test]
async fn test_no_stored_record_yields_none() {
    let h = harness(automatic(""), manual(""), settings());
    assert_eq!(h.orchestrator.get_valid_token("cid").await, None);
}

/// A refreshed token is still returned when persisting it fails.
#[tokio::test]
async fn test_refresh_returns_token_even_if_save_fails() {
    let h = harness(automatic(""), manual(""), settings());
    h.store.seed(stored(0, Some("RT1")));
    h.store.set_fail_saves(true);

    let token = h.orchestrator.get_valid_token_at("cid", NOW).await;

    assert_eq!(token.as_deref(), Some("refreshed_access_token"));
}

#[tokio::test]
async fn test_logout_reports_presence() {
    let h = harness(automatic(""), manual(""), settings());
    assert!(!h.orchestrator.logout().await.unwrap());

    h.store.seed(stored(400, Some("RT1")));
    assert!(h.orchestrator.logout().await.unwrap());
    assert!(h.orchestrator.stored_record().await.is_none());
}
