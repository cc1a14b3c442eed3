//! Traits for token endpoint and token storage operations
//!
//! These traits enable dependency injection and testing by abstracting
//! the identity provider and the token file.

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::token_store::TokenStoreError;
use super::types::TokenRecord;

/// Trait for token endpoint operations
#[async_trait]
pub trait TokenClientTrait: Send + Sync {
    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// Returns error if the request fails or the endpoint answers non-200
    async fn exchange(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        verifier: &str,
    ) -> Result<TokenRecord, OAuthClientError>;

    /// Refresh an access token
    ///
    /// # Errors
    /// Returns error if the refresh token is rejected or the request fails
    async fn refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
    ) -> Result<TokenRecord, OAuthClientError>;
}

/// Trait for token persistence
#[async_trait]
pub trait TokenStoreTrait: Send + Sync {
    /// Stamp and persist a whole record, replacing any previous one
    ///
    /// Returns the record as written (with `saved_at`/`expires_at`).
    ///
    /// # Errors
    /// Returns error if serialization or the atomic write fails
    async fn save(&self, record: TokenRecord) -> Result<TokenRecord, TokenStoreError>;

    /// Load the persisted record; `None` when missing or unreadable
    async fn load(&self) -> Option<TokenRecord>;

    /// Remove the persisted record
    ///
    /// Returns whether a record was present.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be removed
    async fn clear(&self) -> Result<bool, TokenStoreError>;

    /// Human-readable location, for status output
    fn location(&self) -> String;
}
