//! TrendMiner notebook launcher
//!
//! Single binary that:
//! 1. Reads client and user secrets from the OS keyring
//! 2. Fetches a bearer token from the TrendMiner identity provider
//! 3. Keeps that token fresh on a fixed background interval
//! 4. Runs the notebook server with the token in its environment

mod config;
mod error;
mod launch;
mod metrics;
mod token_file;

use std::process::{ExitCode, ExitStatus};
use std::sync::Arc;

use anyhow::{Context, Result};
use token_refresh::{TokenSlot, TokenSource, spawn_refresh_task};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trendminer_auth::{Credentials, KeyringStore, TokenClient};

use crate::config::{Config, LogFormat};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let resolved = Config::resolve_path(cli_config_path);
    let config = Config::load_or_default(&resolved)
        .with_context(|| format!("failed to load config from {}", resolved.path.display()))?;

    init_tracing(config.logging.format);

    info!(
        path = %resolved.path.display(),
        server_url = %config.server_url,
        client_id = %config.client_id,
        username = %config.username,
        refresh_interval_secs = config.refresh_interval_secs,
        "configuration loaded"
    );

    match config.metrics.listen_addr {
        Some(addr) => {
            metrics::install_exporter(addr)
                .with_context(|| format!("failed to start metrics listener on {addr}"))?;
            info!(%addr, "metrics listener started");
        }
        None => metrics::describe(),
    }

    // Keyring backends block; keep them off the runtime threads.
    let credentials = {
        let server_url = config.server_url.clone();
        let client_id = config.client_id.clone();
        let username = config.username.clone();
        tokio::task::spawn_blocking(move || {
            Credentials::load(&KeyringStore, &server_url, &client_id, &username)
        })
        .await
        .context("credential lookup task failed")?
        .context("failed to read credentials from the OS keyring")?
    };

    let client = TokenClient::new(
        config.token_endpoint(),
        credentials,
        config.request_timeout(),
    )
    .context("failed to build token client")?;

    info!(endpoint = client.endpoint(), "fetching initial token");
    let status = run(Arc::new(client), &config).await?;
    Ok(launch::exit_code(status))
}

/// Fetch the first token, start the background tasks and run the notebook
/// server until it exits.
///
/// Without a first token there is nothing to launch with: a failed
/// bootstrap fetch returns before any task or child process is started.
async fn run(source: Arc<dyn TokenSource>, config: &Config) -> Result<ExitStatus> {
    let token = source
        .fetch_token()
        .await
        .context("initial token fetch failed, not starting notebook server")?;
    let slot = TokenSlot::new(token);
    info!("initial token acquired");

    let shutdown = CancellationToken::new();
    // Cancels the background tasks on early returns too.
    let _stop_tasks = shutdown.clone().drop_guard();

    let mirror = match &config.launch.token_file {
        Some(path) => {
            token_file::write_current(path, &slot)
                .await
                .context("failed to write initial token file")?;
            Some(token_file::spawn_mirror(
                path.clone(),
                slot.subscribe(),
                shutdown.clone(),
            ))
        }
        None => None,
    };

    let refresh = spawn_refresh_task(
        source,
        slot.clone(),
        config.refresh_interval(),
        shutdown.clone(),
    );

    let child = launch::spawn(&config.launch, &config.server_url, &slot)?;
    let status = launch::supervise(child).await?;
    info!(%status, "notebook server exited");

    shutdown.cancel();
    if let Err(e) = refresh.await {
        warn!(error = %e, "token refresh task panicked");
    }
    if let Some(mirror) = mirror {
        if let Err(e) = mirror.await {
            warn!(error = %e, "token file mirror panicked");
        }
    }

    Ok(status)
}

/// Initialize tracing on stderr with LOG_LEVEL / RUST_LOG support.
///
/// stdout is left to the notebook server.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
