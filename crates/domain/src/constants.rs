//! Protocol constants
//!
//! Centralized location for timing defaults, provider defaults and the file
//! names that make up the capture handshake.

// Provider defaults
pub const DEFAULT_AUTHORIZE_URL: &str = "https://ims-na1.adobelogin.com/ims/authorize/v2";
pub const DEFAULT_TOKEN_URL: &str = "https://ims-na1.adobelogin.com/ims/token/v3";
pub const DEFAULT_SCOPES: &str = "email profile openid offline_access";

// Capture timing
pub const DEFAULT_CAPTURE_TIMEOUT_SECS: u64 = 120;
pub const POLL_INTERVAL_MS: u64 = 500;
pub const TERMINATE_GRACE_SECS: u64 = 5;

// Token lifecycle
pub const REFRESH_BUFFER_SECS: i64 = 300;

// Capture handshake
pub const ARGS_FILE_NAME: &str = "args.json";
pub const RESULT_FILE_NAME: &str = "result.txt";
pub const CAPTURED_URL_MARKER: &str = "CAPTURED_URL:";

// Default locations
pub const DEFAULT_CAPTURER_APP: &str = "SchemeAuthCapture";
pub const DEFAULT_CAPTURER_DIR_NAME: &str = "capture-helper";
pub const HANDSHAKE_DIR_NAME: &str = ".schemeauth-oauth";
pub const TOKEN_FILE_NAME: &str = ".schemeauth-tokens.json";
