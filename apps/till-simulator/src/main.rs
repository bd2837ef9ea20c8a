//! # Till Simulator
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Simulator Process                           │
//! │                                                                         │
//! │  env ──► SimulatorConfig ──► self-test ──► run loop ──► final stats    │
//! │                                  │              ▲                       │
//! │                            gate failed      Ctrl+C / SIGTERM            │
//! │                              exit 1                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::{bail, Context};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use till_link::SimulatorConfig;
use till_simulator::{RunState, Simulator};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // One loop, one request in flight
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;

    runtime.block_on(run())
}

async fn run() -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting till simulator");

    let config = SimulatorConfig::load().context("loading configuration")?;
    info!(
        api = %config.api_base_url,
        interval_ms = config.interval.as_millis() as u64,
        allowed_failures = config.selftest_allowed_failures,
        stats_store_id = %config.stats_store_id,
        max_response_age_secs = config.max_response_age_secs,
        "Configuration loaded"
    );

    let mut simulator = Simulator::new(config).context("creating simulator")?;

    let report = simulator.self_test().await;
    if simulator.state() == RunState::Aborted {
        bail!(
            "self-test failed: {} of {} probes failed",
            report.failed(),
            report.results.len()
        );
    }

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    simulator.run(&mut shutdown_rx).await;

    info!("Till simulator shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// Default filter `info,till_core=debug,till_link=debug`; `RUST_LOG`
/// overrides it.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till_core=debug,till_link=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
