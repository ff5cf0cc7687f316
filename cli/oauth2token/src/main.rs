//! oauth2token: mint and cache OAuth2 access tokens
//!
//! Reads the OAuth client configuration from the XDG config directory,
//! produces a valid access token (cached, refreshed, or freshly minted via
//! the browser), and prints it to stdout for use in command substitution.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use oauth_flow::{FileSecretStore, OAuthConfig, TokenManager};

/// Program name; also the directory name both config files live under.
const PROG_NAME: &str = "oauth2token";

/// Client-credentials file inside the config directory.
const CONFIG_FILE: &str = "config.json";

/// Requested-scopes file inside the config directory.
const SCOPES_FILE: &str = "scopes.json";

/// Request timeout for token-endpoint calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "oauth2token", version, about = "Mint and cache OAuth2 access tokens")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "error retrieving token");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let dirs = ProjectDirs::from("", "", PROG_NAME)
        .context("could not determine a home directory for config and data paths")?;

    let config = load_config(dirs.config_dir())?;
    debug!(
        redirect = %config.redirect_url,
        scopes = config.scopes.len(),
        "configuration loaded"
    );

    let store = FileSecretStore::new(dirs.data_dir().to_path_buf());
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build http client")?;

    let manager = TokenManager::new(config, Arc::new(store), http);
    let credential = manager.acquire().await.context("failed to acquire token")?;
    debug!(expiry = ?credential.expiry, "credential acquired");

    println!("{}", credential.access_token);
    Ok(())
}

/// Read and parse `config.json` and `scopes.json` from `dir`.
fn load_config(dir: &Path) -> Result<OAuthConfig> {
    let config_path = dir.join(CONFIG_FILE);
    let client_json = std::fs::read(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;

    let scopes_path = dir.join(SCOPES_FILE);
    let scopes_json = std::fs::read(&scopes_path)
        .with_context(|| format!("reading {}", scopes_path.display()))?;

    let config = OAuthConfig::from_json(&client_json, &scopes_json)
        .with_context(|| format!("parsing configuration under {}", dir.display()))?;
    Ok(config)
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
