//! # SchemeAuth Domain
//!
//! Domain types shared by every SchemeAuth crate.
//!
//! This crate contains:
//! - The authentication error taxonomy and `Result` alias
//! - Configuration structures for the provider, capture and storage layers
//! - Protocol constants (handshake file names, timing defaults)
//!
//! ## Architecture
//! - No dependencies on other SchemeAuth crates
//! - Only external dependencies allowed
//! - No I/O beyond resolving default per-user paths

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::{CaptureConfig, Config, ProviderConfig, StorageConfig};
pub use errors::{AuthError, Result};
