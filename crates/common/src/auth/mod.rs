//! OAuth 2.0 + PKCE primitives for native clients
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ AuthOrchestrator │  (schemeauth-core)
//! └────────┬─────────┘
//!          │
//!          ├──► pkce              (verifier / challenge / state)
//!          ├──► authorize         (authorization URL)
//!          ├──► TokenClient       (code exchange + refresh over HTTP)
//!          └──► FileTokenStore    (owner-only JSON file, atomic replace)
//! ```
//!
//! # Module Organization
//!
//! - **[`pkce`]**: RFC 7636 parameter generation and state comparison
//! - **[`authorize`]**: authorization request and URL composition
//! - **[`types`]**: `TokenRecord`, wire `TokenResponse`, provider `OAuthError`
//! - **[`client`]**: token endpoint client
//! - **[`token_store`]**: file-backed persistence with expiry bookkeeping
//! - **[`traits`]**: seams used by the orchestrator and its tests
//!
//! # Security Features
//!
//! - **PKCE**: binds the authorization code to this client without a secret
//! - **State Validation**: constant-time comparison of the CSRF token
//! - **Owner-only storage**: token file is written with `0o600` on Unix

pub mod authorize;
pub mod client;
pub mod pkce;
pub mod token_store;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use authorize::{build_authorization_url, AuthorizationRequest};
pub use client::{OAuthClientError, TokenClient};
pub use pkce::{
    generate_challenge, generate_state, generate_verifier, validate_state, PkceParameters,
};
pub use token_store::{FileTokenStore, TokenStoreError};
pub use traits::{TokenClientTrait, TokenStoreTrait};
pub use types::{OAuthError, TokenRecord, TokenResponse};
