//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory implementations of the auth traits, recording
//!   every call so tests can assert on what the orchestrator did
//!
//! ## Usage
//!
//! ```rust
//! use schemeauth_common::testing::{MockTokenClient, MockTokenStore};
//!
//! let client = MockTokenClient::new();
//! let store = MockTokenStore::new();
//! assert!(client.exchange_calls().is_empty());
//! assert!(store.current().is_none());
//! ```

pub mod mocks;

pub use mocks::{ExchangeCall, MockTokenClient, MockTokenStore};
