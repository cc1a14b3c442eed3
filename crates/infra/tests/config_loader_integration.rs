//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::path::PathBuf;

use schemeauth_domain::constants::DEFAULT_SCOPES;
use schemeauth_infra::config;
use tempfile::TempDir;

#[test]
fn test_load_config_from_toml_file() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("schemeauth.toml");
    std::fs::write(
        &path,
        r#"
[provider]
client_id = "cli-client"
redirect_uri = "adobe+cli://callback"
token_url = "https://idp.example/token"

[capture]
timeout_secs = 60
force_manual = true
capturer_executable = "/opt/capture/run"

[storage]
token_path = "/tmp/schemeauth-test-tokens.json"
refresh_buffer_secs = 120
"#,
    )
    .expect("Failed to write config");

    let config = config::load_from_file(Some(path)).expect("Failed to load TOML config");

    assert_eq!(config.provider.client_id, "cli-client");
    assert_eq!(config.provider.scheme(), Some("adobe+cli"));
    assert_eq!(config.provider.token_url, "https://idp.example/token");
    assert_eq!(config.provider.scopes, DEFAULT_SCOPES);

    assert_eq!(config.capture.timeout_secs, 60);
    assert!(config.capture.force_manual);
    assert_eq!(config.capture.capturer_executable, Some(PathBuf::from("/opt/capture/run")));
    assert_eq!(config.capture.poll_interval_ms, 500);

    assert_eq!(config.storage.token_path, PathBuf::from("/tmp/schemeauth-test-tokens.json"));
    assert_eq!(config.storage.refresh_buffer_secs, 120);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_config_from_json_file() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("schemeauth.json");
    std::fs::write(
        &path,
        r#"{
            "provider": { "client_id": "cli-client", "redirect_uri": "myapp://cb" },
            "capture": { "register_scheme": false }
        }"#,
    )
    .expect("Failed to write config");

    let config = config::load_from_file(Some(path)).expect("Failed to load JSON config");

    assert_eq!(config.provider.redirect_uri, "myapp://cb");
    assert!(!config.capture.register_scheme);
    assert_eq!(config.capture.timeout_secs, 120);
}

#[test]
fn test_file_missing_provider_section_is_rejected() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("schemeauth.toml");
    std::fs::write(&path, "[capture]\ntimeout_secs = 5\n").expect("Failed to write config");

    let err = config::load_from_file(Some(path)).unwrap_err();
    assert_eq!(err.kind(), "config_error");
}

#[test]
fn test_http_redirect_fails_validation() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("schemeauth.toml");
    std::fs::write(
        &path,
        "[provider]\nclient_id = \"cli\"\nredirect_uri = \"http://localhost:8080/cb\"\n",
    )
    .expect("Failed to write config");

    let config = config::load_from_file(Some(path)).expect("parses fine");
    assert_eq!(config.validate().unwrap_err().kind(), "config_error");
}
