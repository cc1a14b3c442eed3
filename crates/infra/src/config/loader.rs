//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file from the working directory, if present
//! 2. Attempts to load from environment variables
//! 3. If a required variable is missing, falls back to a config file;
//!    invalid values in the environment are errors, not a reason to fall back
//! 4. Supports JSON and TOML formats
//! 5. Validates the result before returning it
//!
//! ## Environment Variables
//! - `SCHEMEAUTH_CLIENT_ID` (required): OAuth client id
//! - `SCHEMEAUTH_REDIRECT_URI` (required): custom-scheme redirect URI
//! - `SCHEMEAUTH_SCOPES`: space-separated scopes
//! - `SCHEMEAUTH_AUTHORIZE_URL`, `SCHEMEAUTH_TOKEN_URL`: provider endpoints
//! - `SCHEMEAUTH_CAPTURE_TIMEOUT`: capture timeout in seconds
//! - `SCHEMEAUTH_FORCE_MANUAL`: always use the paste prompt (true/false)
//! - `SCHEMEAUTH_REGISTER_SCHEME`: write the Linux scheme handler (true/false)
//! - `SCHEMEAUTH_HANDSHAKE_DIR`: handshake directory
//! - `SCHEMEAUTH_CAPTURER_DIR`, `SCHEMEAUTH_CAPTURER_APP`: packaged helper
//! - `SCHEMEAUTH_CAPTURER_EXECUTABLE`: explicit helper executable
//! - `SCHEMEAUTH_TOKEN_PATH`: token file
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./schemeauth.toml` or `./schemeauth.json` (current working directory)
//! 2. Next to the executable
//! 3. `<user config dir>/schemeauth/config.{toml,json}`

use std::path::{Path, PathBuf};

use schemeauth_domain::{AuthError, CaptureConfig, Config, ProviderConfig, Result, StorageConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const CLIENT_ID: &str = "SCHEMEAUTH_CLIENT_ID";
const REDIRECT_URI: &str = "SCHEMEAUTH_REDIRECT_URI";
const SCOPES: &str = "SCHEMEAUTH_SCOPES";
const AUTHORIZE_URL: &str = "SCHEMEAUTH_AUTHORIZE_URL";
const TOKEN_URL: &str = "SCHEMEAUTH_TOKEN_URL";
const CAPTURE_TIMEOUT: &str = "SCHEMEAUTH_CAPTURE_TIMEOUT";
const FORCE_MANUAL: &str = "SCHEMEAUTH_FORCE_MANUAL";
const REGISTER_SCHEME: &str = "SCHEMEAUTH_REGISTER_SCHEME";
const HANDSHAKE_DIR: &str = "SCHEMEAUTH_HANDSHAKE_DIR";
const CAPTURER_DIR: &str = "SCHEMEAUTH_CAPTURER_DIR";
const CAPTURER_APP: &str = "SCHEMEAUTH_CAPTURER_APP";
const CAPTURER_EXECUTABLE: &str = "SCHEMEAUTH_CAPTURER_EXECUTABLE";
const TOKEN_PATH: &str = "SCHEMEAUTH_TOKEN_PATH";

/// Every recognised variable with whether it is required
pub const ENV_VARS: &[(&str, bool)] = &[
    (CLIENT_ID, true),
    (REDIRECT_URI, true),
    (SCOPES, false),
    (AUTHORIZE_URL, false),
    (TOKEN_URL, false),
    (CAPTURE_TIMEOUT, false),
    (FORCE_MANUAL, false),
    (REGISTER_SCHEME, false),
    (HANDSHAKE_DIR, false),
    (CAPTURER_DIR, false),
    (CAPTURER_APP, false),
    (CAPTURER_EXECUTABLE, false),
    (TOKEN_PATH, false),
];

/// The `[storage]` table of a config file, other tables ignored
#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    #[serde(default)]
    storage: StorageConfig,
}

/// Presence of one configuration variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVarStatus {
    pub name: &'static str,
    pub required: bool,
    pub set: bool,
}

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after reading `.env`).
/// Falls back to a config file only when a required variable is absent; an
/// invalid environment value is reported as is.
///
/// # Errors
/// Returns `AuthError::Config` if:
/// - Configuration cannot be loaded from either source
/// - An environment value or the file format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    load_dotenv();

    let config = match missing_required() {
        None => {
            let config = load_from_env()?;
            tracing::info!("config.loaded_from_env");
            config
        }
        Some(missing) => {
            tracing::debug!(missing, "config.env_incomplete");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Storage settings alone, for commands that only touch the token file.
///
/// Provider settings are not required. `SCHEMEAUTH_TOKEN_PATH` wins over
/// the `[storage]` section of a probed config file, which wins over the
/// defaults.
///
/// # Errors
/// Returns `AuthError::Config` if a probed config file cannot be read or
/// parsed.
pub fn load_storage() -> Result<StorageConfig> {
    load_dotenv();

    let mut storage = match probe_config_paths() {
        Some(path) => {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| AuthError::Config(format!("Failed to read config file: {e}")))?;
            parse_file::<StorageSection>(&contents, &path)?.storage
        }
        None => StorageConfig::default(),
    };
    if let Some(path) = env_opt(TOKEN_PATH) {
        storage.token_path = PathBuf::from(path);
    }
    Ok(storage)
}

/// Load configuration from environment variables
///
/// `SCHEMEAUTH_CLIENT_ID` and `SCHEMEAUTH_REDIRECT_URI` must be present;
/// everything else falls back to the built-in defaults.
///
/// # Errors
/// Returns `AuthError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let mut provider = ProviderConfig::new(env_var(CLIENT_ID)?, env_var(REDIRECT_URI)?);
    if let Some(scopes) = env_opt(SCOPES) {
        provider.scopes = scopes;
    }
    if let Some(url) = env_opt(AUTHORIZE_URL) {
        provider.authorize_url = url;
    }
    if let Some(url) = env_opt(TOKEN_URL) {
        provider.token_url = url;
    }

    let mut capture = CaptureConfig::default();
    if let Some(raw) = env_opt(CAPTURE_TIMEOUT) {
        capture.timeout_secs = raw
            .parse::<u64>()
            .map_err(|e| AuthError::Config(format!("Invalid capture timeout {raw:?}: {e}")))?;
    }
    capture.force_manual = env_bool(FORCE_MANUAL, capture.force_manual);
    capture.register_scheme = env_bool(REGISTER_SCHEME, capture.register_scheme);
    if let Some(dir) = env_opt(HANDSHAKE_DIR) {
        capture.handshake_dir = PathBuf::from(dir);
    }
    capture.capturer_dir = env_opt(CAPTURER_DIR).map(PathBuf::from);
    if let Some(app) = env_opt(CAPTURER_APP) {
        capture.capturer_app = app;
    }
    capture.capturer_executable = env_opt(CAPTURER_EXECUTABLE).map(PathBuf::from);

    let mut storage = StorageConfig::default();
    if let Some(path) = env_opt(TOKEN_PATH) {
        storage.token_path = PathBuf::from(path);
    }

    Ok(Config { provider, capture, storage })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `AuthError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthError::Config(format!(
                "Set {CLIENT_ID} and {REDIRECT_URI}, or create schemeauth.toml"
            ))
        })?,
    };

    tracing::info!(path = %config_path.display(), "config.loading_file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    parse_file(contents, path)
}

fn parse_file<T: DeserializeOwned>(contents: &str, path: &Path) -> Result<T> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend([cwd.join("schemeauth.toml"), cwd.join("schemeauth.json")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend([exe_dir.join("schemeauth.toml"), exe_dir.join("schemeauth.json")]);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join("schemeauth");
        candidates.extend([app_dir.join("config.toml"), app_dir.join("config.json")]);
    }

    candidates.into_iter().find(|path| path.is_file())
}

/// Which configuration variables are set, for status reporting.
///
/// Only presence is reported; values never leave this function.
pub fn config_status() -> Vec<EnvVarStatus> {
    ENV_VARS
        .iter()
        .map(|&(name, required)| EnvVarStatus { name, required, set: env_opt(name).is_some() })
        .collect()
}

fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "config.dotenv_loaded");
    }
}

/// First required variable that is unset or empty
fn missing_required() -> Option<&'static str> {
    ENV_VARS
        .iter()
        .find(|&&(name, required)| required && env_opt(name).is_none())
        .map(|&(name, _)| name)
}

/// Get required environment variable
///
/// # Errors
/// Returns `AuthError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        AuthError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional variable; empty counts as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
