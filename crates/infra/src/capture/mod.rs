//! Redirect capture adapters
//!
//! - [`CaptureCoordinator`]: automatic capture through the external helper
//! - [`ManualRedirectCapture`]: paste-back prompt for headless sessions

pub mod coordinator;
pub mod handshake;
pub mod locator;
pub mod manual;
pub mod registration;

pub use coordinator::CaptureCoordinator;
pub use handshake::{Handshake, HandshakeArgs};
pub use locator::{default_capturer_root, CapturerSource, HostPlatform, LaunchSpec};
pub use manual::ManualRedirectCapture;
