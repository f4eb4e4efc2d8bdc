//! Callout service binary: answers NATS authorization callout requests
//! until interrupted, then drains and exits.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use callout_service::{AppConfig, CalloutHandler, CalloutService};
use clap::Parser;
use tracing::{info, warn};

/// NATS authorization callout service.
#[derive(Parser, Debug)]
#[command(name = "callout-service", about = "NATS authorization callout service")]
struct Args {
    /// JSON configuration file (URL, signing seed, users).
    #[arg(long, env = "CALLOUT_CONFIG")]
    config: Option<PathBuf>,

    /// NATS server URL; overrides the configuration file.
    #[arg(long, env = "NATS_URL")]
    nats_url: Option<String>,

    /// Account nkey seed used to sign responses; overrides the configuration file.
    #[arg(long, env = "CALLOUT_NKEY_SEED", hide_env_values = true)]
    nkey_seed: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (controlled via RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            warn!("no configuration file given, no users are registered");
            AppConfig::default()
        }
    }
    .with_overrides(args.nats_url, args.nkey_seed);

    // Fail fast on a bad seed or user table, before touching the network.
    let handler = CalloutHandler::from_config(&config).context("invalid configuration")?;
    info!(
        issuer = %handler.public_key(),
        users = handler.credentials().len(),
        "signing identity loaded"
    );

    let service = CalloutService::connect(&config, Arc::new(handler))
        .await
        .context("failed to connect to NATS")?;
    service.start().await.context("failed to subscribe")?;

    shutdown_signal().await;
    info!("shutdown signal received, draining");

    service.stop().await.context("failed to stop cleanly")?;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
