//! rfo-metrics exporter
//!
//! - Loads `rfo-metrics.yaml` (or `$RFO_METRICS_CONFIG`), defaults if absent
//! - Starts the stale-metric GC task
//! - Serves /metrics, /healthz, /readyz, /debug/gc until Ctrl-C

use std::net::SocketAddr;
use std::path::Path;

use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use rfo_metrics_core::error::{MetricsError, Result};
use rfo_metrics_exporter::{app_state::AppState, config, router, MetricsGc};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code(), "rfo-metrics-exporter failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = config::config_path();
    let cfg = if Path::new(&path).exists() {
        config::load_from_file(&path)?
    } else {
        tracing::warn!(%path, "config file not found, using defaults");
        let cfg = config::ExporterConfig::default();
        cfg.validate()?;
        cfg
    };

    let listen: SocketAddr = cfg.metrics.listen.parse().map_err(|e| {
        MetricsError::BadConfig(format!("metrics.listen must be a valid SocketAddr: {e}"))
    })?;

    let state = AppState::new(cfg)?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let gc = MetricsGc::new(state.clone()).spawn(shutdown_rx);

    let app = router::build_router(state.clone());

    tracing::info!(%listen, "rfo-metrics-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
            state.set_draining();
            let _ = shutdown_tx.send(());
        })
        .await?;

    if let Err(e) = gc.await {
        return Err(MetricsError::Internal(format!("gc task failed: {e}")));
    }
    Ok(())
}
