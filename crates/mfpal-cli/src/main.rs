//! mfpal - log in to MyFitnessPal from the terminal.
//!
//! Keeps a session in the cache directory and the password in the OS
//! keychain so later runs can refresh or log in again without prompting.

mod app;

use std::io;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

const USAGE: &str = "Usage: mfpal <command>

Commands:
  login [username]   Log in and save the session
  refresh            Exchange the saved refresh token for a new session
  whoami             Show the logged-in user (refreshes an expired session)
  logout             Remove the saved session and stored password

Environment:
  MFP_CLIENT_ID, MFP_CLIENT_SECRET   App client credentials (required)
  MFP_PASSWORD                       Password for non-interactive login
  MFPAL_IDENTITY_URL, MFPAL_API_URL  Service base URL overrides
  RUST_LOG                           Log filter (default: warn)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level, e.g. RUST_LOG=mfpal_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    info!(command = %command, "mfpal starting");
    let mut app = App::new()?;

    match command.as_str() {
        "login" => app.login(args.get(1).cloned()).await,
        "refresh" => app.refresh().await,
        "whoami" => app.whoami().await,
        "logout" => app.logout(),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}
