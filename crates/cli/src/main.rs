//! `schemeauth`: sign a command-line tool in through a custom URL scheme.
//!
//! Run with: `schemeauth <command>`
//!
//! User-facing output is printed directly (`println!`/`eprintln!`);
//! diagnostics go through `tracing` to stderr so `access-token` output stays
//! pipeable.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schemeauth_domain::AuthError;

mod commands;
mod logging;
mod render;

use logging::LogFormat;

#[derive(Parser)]
#[command(name = "schemeauth", version, about = "OAuth2 PKCE login for command-line tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store tokens.
    Auth {
        /// Paste the redirect URL instead of launching the capture helper.
        #[arg(long)]
        manual: bool,
        /// Seconds to wait for the capture helper.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
    /// Show the stored tokens, masked.
    Token,
    /// Print a valid access token, refreshing it first if needed.
    AccessToken,
    /// Delete stored tokens.
    Logout,
    /// Show configuration, capture helper and token status.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "cli.started");

    let result = match cli.command {
        Command::Auth { manual, timeout } => commands::auth(manual, timeout).await,
        Command::Token => commands::token(),
        Command::AccessToken => commands::access_token().await,
        Command::Logout => commands::logout(),
        Command::Status => commands::status(),
    };

    match result {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<AuthError>() {
            Some(auth_error) => commands::report(auth_error),
            None => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
