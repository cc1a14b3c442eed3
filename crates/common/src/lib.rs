//! Reusable OAuth 2.0 building blocks shared across SchemeAuth crates.
//!
//! Everything here is provider-agnostic: PKCE generation, authorization URL
//! composition, the token endpoint client and the on-disk token store. The
//! login state machine that ties them together lives in `schemeauth-core`.
//!
//! # Features
//!
//! - `test-utils`: in-memory implementations of [`auth::TokenClientTrait`]
//!   and [`auth::TokenStoreTrait`] for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use auth::{
    AuthorizationRequest, FileTokenStore, OAuthClientError, PkceParameters, TokenClient,
    TokenClientTrait, TokenRecord, TokenResponse, TokenStoreError, TokenStoreTrait,
};
