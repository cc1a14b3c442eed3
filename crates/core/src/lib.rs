//! # SchemeAuth Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The login state machine (`AuthOrchestrator`)
//! - Redirect parsing and validation shared by both capture strategies
//! - The capture strategy policy
//! - Port interfaces implemented by `schemeauth-infra`
//!
//! ## Architecture Principles
//! - Only depends on `schemeauth-common` and `schemeauth-domain`
//! - No process, filesystem or platform code
//! - All external dependencies via traits

pub mod auth;

// Re-export specific items to avoid ambiguity
pub use auth::ports::{CaptureRequest, CaptureStrategy, CapturedRedirect, RedirectCapture};
pub use auth::redirect::parse_redirect;
pub use auth::service::{AuthOrchestrator, AuthSettings, AuthState};
pub use auth::strategy::select_strategy;
