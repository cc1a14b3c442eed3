//! Command handlers
//!
//! Each handler loads configuration, wires the adapters into an
//! [`AuthOrchestrator`] and renders the outcome. Errors bubble up as
//! `anyhow::Error`; `main` prints auth failures with their kind and hint.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use schemeauth_common::{FileTokenStore, TokenClient};
use schemeauth_core::{AuthOrchestrator, AuthSettings, CaptureStrategy};
use schemeauth_domain::{AuthError, Config};
use schemeauth_infra::config::{self as config_loader, EnvVarStatus};
use schemeauth_infra::{detect_headless, CaptureCoordinator, CapturerSource, ManualRedirectCapture};

use crate::render;

type Orchestrator = AuthOrchestrator<TokenClient, FileTokenStore>;

fn build_orchestrator(config: &Config) -> Orchestrator {
    AuthOrchestrator::new(
        Arc::new(TokenClient::new(config.provider.token_url.clone())),
        Arc::new(FileTokenStore::new(config.storage.token_path.clone())),
        Arc::new(CaptureCoordinator::from_config(&config.capture)),
        Arc::new(ManualRedirectCapture::stdio()),
        AuthSettings::from_config(config, detect_headless()),
    )
}

/// Print an auth failure with its kind and remediation hint.
pub fn report(err: &AuthError) -> ExitCode {
    eprintln!("Error [{}]: {}", err.kind(), err.description());
    eprintln!("Hint: {}", err.hint());
    ExitCode::FAILURE
}

/// `auth [--manual] [--timeout N]`
pub async fn auth(manual: bool, timeout: Option<u64>) -> Result<ExitCode> {
    let mut config = config_loader::load()?;
    if manual {
        config.capture.force_manual = true;
    }
    if let Some(secs) = timeout {
        config.capture.timeout_secs = secs;
    }
    config.validate()?;

    let orchestrator = build_orchestrator(&config);
    match orchestrator.strategy() {
        CaptureStrategy::Automatic => eprintln!(
            "Opening the browser to sign in (waiting up to {}s)...",
            config.capture.timeout_secs
        ),
        CaptureStrategy::Manual if !manual => {
            eprintln!("No display detected, switching to manual sign-in.");
        }
        CaptureStrategy::Manual => {}
    }

    match orchestrator.authenticate().await {
        Ok(record) => {
            println!("Signed in. Tokens saved to {}", config.storage.token_path.display());
            if let Some(expires_at) = record.expires_at {
                println!("Access token expires {}", render::timestamp(expires_at));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report(&e)),
    }
}

/// `token`: masked view of the stored record. Needs no provider settings.
pub fn token() -> Result<ExitCode> {
    let storage = config_loader::load_storage()?;
    let store = FileTokenStore::new(storage.token_path.clone());

    let Some(record) = store.load_sync() else {
        println!("No stored tokens. Run `schemeauth auth` to sign in.");
        return Ok(ExitCode::FAILURE);
    };

    println!("Tokens in {}", store.path().display());
    render::print_rows(&render::token_rows(
        &record,
        chrono::Utc::now().timestamp(),
        storage.refresh_buffer_secs,
    ));
    Ok(ExitCode::SUCCESS)
}

/// `access-token`: the token alone on stdout, refreshed if needed
pub async fn access_token() -> Result<ExitCode> {
    let config = config_loader::load()?;
    let orchestrator = build_orchestrator(&config);

    match orchestrator.get_valid_token(&config.provider.client_id).await {
        Some(token) => {
            println!("{token}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No valid access token. Run `schemeauth auth` to sign in.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `logout`. Needs no provider settings.
pub fn logout() -> Result<ExitCode> {
    let storage = config_loader::load_storage()?;
    let store = FileTokenStore::new(storage.token_path);

    if store.clear_sync()? {
        println!("Tokens cleared from {}", store.path().display());
    } else {
        println!("No tokens to clear.");
    }
    Ok(ExitCode::SUCCESS)
}

/// `status`: configuration, capture readiness and token state.
///
/// Reports as much as it can even when configuration is incomplete.
pub fn status() -> Result<ExitCode> {
    let loaded = config_loader::load();

    println!("Configuration");
    let vars = config_loader::config_status();
    render::print_rows(&vars.iter().map(env_row).collect::<Vec<_>>());

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            println!();
            return Ok(report(&e));
        }
    };

    println!();
    println!("Redirect capture");
    let headless = detect_headless();
    let readiness = if config.capture.force_manual {
        "manual (forced by configuration)".to_string()
    } else if headless {
        "manual (no display detected)".to_string()
    } else {
        match CapturerSource::from_config(&config.capture).check_ready() {
            Ok(ready) => ready,
            Err(e) => format!("not ready [{}]: {}", e.kind(), e.description()),
        }
    };
    render::print_rows(&[
        ("Redirect URI", config.provider.redirect_uri.clone()),
        ("Capture", readiness),
    ]);

    println!();
    println!("Tokens");
    let store = FileTokenStore::new(config.storage.token_path.clone());
    let token_state = store.load_sync().map_or_else(
        || "none stored".to_string(),
        |record| {
            render::Validity::of(
                &record,
                chrono::Utc::now().timestamp(),
                config.storage.refresh_buffer_secs,
            )
            .label()
        },
    );
    render::print_rows(&[
        ("Location", store.path().display().to_string()),
        ("Status", token_state),
    ]);

    Ok(ExitCode::SUCCESS)
}

fn env_row(status: &EnvVarStatus) -> (&'static str, String) {
    let state = match (status.set, status.required) {
        (true, _) => "set",
        (false, true) => "missing (required)",
        (false, false) => "not set",
    };
    (status.name, state.to_string())
}
