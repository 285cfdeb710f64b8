//! Hazard feed binary entrypoint.
//! Loads config, warms the snapshots, starts the scheduler and serves the Axum router.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hazard_feed::http::ReqwestClient;
use hazard_feed::metrics::Metrics;
use hazard_feed::{FeedConfig, Pipeline};

/// Compact logs by default; `LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hazard_feed=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = ?e, "ctrl_c listener failed; shutting down");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = FeedConfig::load_default().context("loading feed config")?;
    tracing::info!(
        seismic = %cfg.seismic.url,
        cyclone = %cfg.cyclone.url,
        downstream = %cfg.downstream.url,
        poll_secs = cfg.poll_interval_secs,
        "config loaded"
    );

    let metrics = Metrics::init()?;
    let client = Arc::new(ReqwestClient::new(cfg.http_timeout())?);
    let mut pipeline = Pipeline::build(&cfg, client);

    // First reads must not be trivially empty.
    pipeline.scheduler.warm_up().await;
    pipeline.scheduler.start();

    let app = pipeline.router().merge(metrics.router());
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    pipeline.scheduler.stop().await;
    tracing::info!("shutdown complete");
    Ok(())
}
