//! Error types used throughout the authentication flow

use thiserror::Error;

/// Failure kinds surfaced by a login attempt or a token operation.
///
/// Every variant maps to a stable snake_case label via [`AuthError::kind`],
/// which callers use for logging and scripting. Provider denials keep the
/// provider's own error code as their label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The capture helper is not installed; carries remediation text.
    #[error("Capture helper unavailable: {0}")]
    CapturerUnavailable(String),

    #[error("Capture helper app not found: {0}")]
    AppNotFound(String),

    #[error("Capture helper executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Capture helper exited unexpectedly: {0}")]
    CapturerCrashed(String),

    /// No redirect arrived before the capture ended (timeout or clean exit).
    #[error("No redirect received: {0}")]
    NoRedirect(String),

    #[error("No authorization code in redirect URL")]
    NoCode,

    #[error("State parameter mismatch, possible CSRF attempt")]
    StateMismatch,

    #[error("Could not parse redirect URL: {0}")]
    Parse(String),

    #[error("No redirect URL provided")]
    NoInput,

    /// The identity provider redirected back with an `error` parameter.
    #[error("Authorization failed ({error}): {description}")]
    Provider { error: String, description: String },

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AuthError {
    /// Stable label for this failure.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::CapturerUnavailable(_) => "capturer_unavailable",
            Self::AppNotFound(_) => "app_not_found",
            Self::ExecutableNotFound(_) => "executable_not_found",
            Self::UnsupportedPlatform(_) => "unsupported_platform",
            Self::CapturerCrashed(_) => "capturer_crashed",
            Self::NoRedirect(_) => "no_redirect",
            Self::NoCode => "no_code",
            Self::StateMismatch => "state_mismatch",
            Self::Parse(_) => "parse_error",
            Self::NoInput => "no_input",
            Self::Provider { error, .. } => error.as_str(),
            Self::TokenExchange(_) => "token_exchange",
            Self::Storage(_) => "storage_error",
            Self::Config(_) => "config_error",
            Self::Unexpected(_) => "unexpected_error",
        }
    }

    /// Human-readable description without the kind prefix.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CapturerUnavailable(msg)
            | Self::AppNotFound(msg)
            | Self::ExecutableNotFound(msg)
            | Self::UnsupportedPlatform(msg)
            | Self::CapturerCrashed(msg)
            | Self::NoRedirect(msg)
            | Self::Parse(msg)
            | Self::TokenExchange(msg)
            | Self::Storage(msg)
            | Self::Config(msg)
            | Self::Unexpected(msg) => msg.clone(),
            Self::Provider { description, .. } => description.clone(),
            Self::NoCode | Self::StateMismatch | Self::NoInput => self.to_string(),
        }
    }

    /// Actionable next step for the user.
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::CapturerUnavailable(_) => {
                "Package the capture helper for this platform, or rerun with --manual."
            }
            Self::AppNotFound(_) => {
                "Check SCHEMEAUTH_CAPTURER_DIR points at the packaged helper directory."
            }
            Self::ExecutableNotFound(_) => {
                "The helper build is incomplete; repackage it or set \
                 SCHEMEAUTH_CAPTURER_EXECUTABLE."
            }
            Self::UnsupportedPlatform(_) => {
                "Automatic capture is not available here; rerun with --manual."
            }
            Self::CapturerCrashed(_) => {
                "Rerun with --verbose to see the helper output, or use --manual."
            }
            Self::NoRedirect(_) => {
                "Finish signing in within the time limit, raise --timeout, or use --manual."
            }
            Self::NoCode => "Copy the complete redirect URL including its query string.",
            Self::StateMismatch => {
                "Start a fresh login; do not reuse redirect URLs from earlier attempts."
            }
            Self::Parse(_) => "Paste the full redirect URL exactly as the browser shows it.",
            Self::NoInput => "Paste the redirect URL when prompted.",
            Self::Provider { .. } => {
                "The provider refused the request; check the account and client settings."
            }
            Self::TokenExchange(_) => {
                "Verify SCHEMEAUTH_CLIENT_ID and SCHEMEAUTH_REDIRECT_URI match the provider setup."
            }
            Self::Storage(_) => "Check permissions on the token file location.",
            Self::Config(_) => {
                "Set the required SCHEMEAUTH_* variables or provide schemeauth.toml."
            }
            Self::Unexpected(_) => "Rerun with --verbose and report the output.",
        }
    }
}

/// Result type alias for SchemeAuth operations
pub type Result<T> = std::result::Result<T, AuthError>;
