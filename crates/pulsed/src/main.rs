//! pulsed — the PulseGrid daemon.
//!
//! Single binary that assembles the monitoring subsystems:
//! - Source manifest (pulsegrid.toml)
//! - Health monitor with per-source probe timers
//! - REST API + SSE event stream
//!
//! # Usage
//!
//! ```text
//! pulsed --config pulsegrid.toml --port 8080
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use pulsegrid_core::{parse_duration, PulseConfig};
use pulsegrid_monitor::{HealthMonitor, HttpProbe, MonitoredSource};

#[derive(Parser)]
#[command(name = "pulsed", about = "PulseGrid health monitoring daemon")]
struct Cli {
    /// Path to the source manifest.
    #[arg(long, default_value = "pulsegrid.toml")]
    config: PathBuf,

    /// Port to listen on.
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Override the per-probe timeout (e.g. "5s").
    #[arg(long)]
    probe_timeout: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pulsed=debug,pulsegrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("PulseGrid daemon starting");

    // ── Load configuration ─────────────────────────────────────

    let config = PulseConfig::from_file(&cli.config)?;
    let mut monitor_config = config.monitor_config()?;
    if let Some(timeout) = &cli.probe_timeout {
        monitor_config.probe_timeout = parse_duration(timeout)?;
    }

    let sources: Vec<MonitoredSource> = config
        .source_specs()?
        .into_iter()
        .map(|spec| MonitoredSource {
            name: spec.name.clone(),
            interval: spec.interval,
            probe: Arc::new(HttpProbe::new(spec.address, spec.endpoint)),
        })
        .collect();
    info!(
        path = ?cli.config,
        sources = sources.len(),
        "source manifest loaded"
    );

    // ── Start the monitor ──────────────────────────────────────

    let monitor = HealthMonitor::new(monitor_config, sources);
    monitor.start_monitoring().await;

    // ── Start API server ───────────────────────────────────────

    let router = pulsegrid_api::build_router(monitor.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));

    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let shutdown_monitor = monitor.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
            shutdown_monitor.stop_monitoring().await;
        })
        .await?;

    info!("PulseGrid daemon stopped");
    Ok(())
}
