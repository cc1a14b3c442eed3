//! # SchemeAuth Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The external capturer driver (process launch, file handshake, polling)
//! - Linux custom-scheme registration
//! - Manual paste-back capture over stdin
//! - Environment probes and the configuration loader
//!
//! ## Architecture
//! - Implements `RedirectCapture` defined in `schemeauth-core`
//! - Depends on `schemeauth-domain` and `schemeauth-core`
//! - Contains all "impure" code (processes, filesystem, terminal I/O)

pub mod capture;
pub mod config;
pub mod platform;

// Re-export commonly used items
pub use capture::{
    CaptureCoordinator, CapturerSource, Handshake, HostPlatform, LaunchSpec,
    ManualRedirectCapture,
};
pub use platform::detect_headless;
