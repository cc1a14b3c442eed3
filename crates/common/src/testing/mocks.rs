//! Mock implementations of the auth traits
//!
//! Both mocks are cheap to clone; clones share state, so a test can hand one
//! copy to the orchestrator and inspect the other.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::auth::{
    OAuthClientError, TokenClientTrait, TokenRecord, TokenStoreError, TokenStoreTrait,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Arguments of one recorded `exchange` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCall {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub verifier: String,
}

type Outcome = Result<TokenRecord, String>;

/// Mock token endpoint that never touches the network.
///
/// Failures are reported as `OAuthClientError::Provider` with status 400 and
/// the configured message.
#[derive(Clone, Debug)]
pub struct MockTokenClient {
    exchange_outcome: Arc<Mutex<Outcome>>,
    refresh_outcome: Arc<Mutex<Outcome>>,
    exchange_calls: Arc<Mutex<Vec<ExchangeCall>>>,
    refresh_calls: Arc<Mutex<Vec<String>>>,
}

impl MockTokenClient {
    /// Succeeds with `mock_access_token` / `mock_refresh_token` (3600 s) by
    /// default; refresh yields `refreshed_access_token` with no new refresh
    /// token.
    pub fn new() -> Self {
        let exchanged = TokenRecord::new("mock_access_token", Some(3600))
            .with_refresh_token("mock_refresh_token");
        let refreshed = TokenRecord::new("refreshed_access_token", Some(3600));

        Self {
            exchange_outcome: Arc::new(Mutex::new(Ok(exchanged))),
            refresh_outcome: Arc::new(Mutex::new(Ok(refreshed))),
            exchange_calls: Arc::new(Mutex::new(Vec::new())),
            refresh_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_exchange_response(&self, record: TokenRecord) {
        *lock(&self.exchange_outcome) = Ok(record);
    }

    pub fn fail_exchange(&self, message: impl Into<String>) {
        *lock(&self.exchange_outcome) = Err(message.into());
    }

    pub fn set_refresh_response(&self, record: TokenRecord) {
        *lock(&self.refresh_outcome) = Ok(record);
    }

    pub fn fail_refresh(&self, message: impl Into<String>) {
        *lock(&self.refresh_outcome) = Err(message.into());
    }

    #[must_use]
    pub fn exchange_calls(&self) -> Vec<ExchangeCall> {
        lock(&self.exchange_calls).clone()
    }

    /// Refresh tokens passed to `refresh`, in call order
    #[must_use]
    pub fn refresh_calls(&self) -> Vec<String> {
        lock(&self.refresh_calls).clone()
    }

    fn outcome(outcome: &Mutex<Outcome>) -> Result<TokenRecord, OAuthClientError> {
        lock(outcome).clone().map_err(|message| OAuthClientError::Provider {
            status: 400,
            error: None,
            message,
        })
    }
}

impl Default for MockTokenClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenClientTrait for MockTokenClient {
    async fn exchange(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        verifier: &str,
    ) -> Result<TokenRecord, OAuthClientError> {
        lock(&self.exchange_calls).push(ExchangeCall {
            code: code.to_string(),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            verifier: verifier.to_string(),
        });
        Self::outcome(&self.exchange_outcome)
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        _client_id: &str,
    ) -> Result<TokenRecord, OAuthClientError> {
        lock(&self.refresh_calls).push(refresh_token.to_string());
        Self::outcome(&self.refresh_outcome)
    }
}

/// In-memory token store with a controllable clock.
#[derive(Clone, Debug)]
pub struct MockTokenStore {
    record: Arc<Mutex<Option<TokenRecord>>>,
    now: Arc<Mutex<i64>>,
    save_count: Arc<Mutex<usize>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl MockTokenStore {
    /// Empty store whose clock reads the current wall time.
    pub fn new() -> Self {
        Self {
            record: Arc::new(Mutex::new(None)),
            now: Arc::new(Mutex::new(chrono::Utc::now().timestamp())),
            save_count: Arc::new(Mutex::new(0)),
            fail_saves: Arc::new(Mutex::new(false)),
        }
    }

    /// Place a record directly, without stamping it.
    pub fn seed(&self, record: TokenRecord) {
        *lock(&self.record) = Some(record);
    }

    /// Timestamp used to stamp subsequent saves.
    pub fn set_now(&self, now: i64) {
        *lock(&self.now) = now;
    }

    pub fn set_fail_saves(&self, fail: bool) {
        *lock(&self.fail_saves) = fail;
    }

    #[must_use]
    pub fn current(&self) -> Option<TokenRecord> {
        lock(&self.record).clone()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        *lock(&self.save_count)
    }
}

impl Default for MockTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStoreTrait for MockTokenStore {
    async fn save(&self, mut record: TokenRecord) -> Result<TokenRecord, TokenStoreError> {
        if *lock(&self.fail_saves) {
            return Err(TokenStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "mock store is read-only",
            )));
        }

        record.stamp(*lock(&self.now));
        *lock(&self.record) = Some(record.clone());
        *lock(&self.save_count) += 1;
        Ok(record)
    }

    async fn load(&self) -> Option<TokenRecord> {
        self.current()
    }

    async fn clear(&self) -> Result<bool, TokenStoreError> {
        Ok(lock(&self.record).take().is_some())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_stamps_with_clock() {
        let store = MockTokenStore::new();
        store.set_now(100);

        let saved = store.save(TokenRecord::new("AT", Some(50))).await.unwrap();

        assert_eq!(saved.expires_at, Some(150));
        assert_eq!(store.save_count(), 1);
        assert!(store.clear().await.unwrap());
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_client_records_calls() {
        let client = MockTokenClient::new();
        client.fail_refresh("invalid_grant");

        let exchanged = client.exchange("code", "cid", "myapp://cb", "verifier").await.unwrap();
        assert_eq!(exchanged.access_token, "mock_access_token");
        assert!(client.refresh("RT", "cid").await.is_err());

        assert_eq!(client.exchange_calls()[0].code, "code");
        assert_eq!(client.refresh_calls(), vec!["RT".to_string()]);
    }
}
