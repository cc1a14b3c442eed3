//! Configuration loading
//!
//! Loads the `Config` from environment variables, `.env` and config files.

pub mod loader;

// Re-export commonly used items
pub use loader::{
    config_status, load, load_from_env, load_from_file, load_storage, probe_config_paths,
    EnvVarStatus, ENV_VARS,
};
