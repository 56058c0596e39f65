//! Session CLI
//!
//! Sends one request to a cookie-session backend through `SessionClient`:
//! an expired session is renewed transparently, and a failed renewal
//! invalidates the session and exits non-zero.

mod command;
mod config;
mod metrics;

use anyhow::{Context, Result};
use session_client::SessionStatus;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::Args;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr so stdout carries only the response document
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = Args::parse(&raw)?;

    // Install before the client emits anything
    let prometheus = metrics::install_recorder().context("failed to install Prometheus recorder")?;

    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.client.base_url,
        timeout_secs = config.client.timeout_secs,
        refresh_path = %config.client.refresh_path,
        headers = config.headers.len(),
        cookies = config.session.cookies.len(),
        "configuration loaded"
    );

    let (client, session) = command::build_client(&config)?;
    let watcher = tokio::spawn(watch_session(session.subscribe()));
    let result = command::run(&client, &args).await;

    // An invalidation has already been published; let the watcher report it
    if session.status() == SessionStatus::Invalidated {
        if let Err(e) = watcher.await {
            warn!(error = %e, "session watcher task failed");
        }
    } else {
        watcher.abort();
    }

    if args.metrics {
        eprintln!("{}", prometheus.render());
    }

    let output = result.with_context(|| format!("{} {} failed", args.method, args.path))?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Log once when the session is invalidated, then stop watching.
async fn watch_session(mut status: watch::Receiver<SessionStatus>) {
    while status.changed().await.is_ok() {
        if *status.borrow_and_update() == SessionStatus::Invalidated {
            warn!("session invalidated, sign in again to obtain new session cookies");
            return;
        }
    }
}
