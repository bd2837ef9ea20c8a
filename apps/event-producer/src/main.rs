//! # Event Producer
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Event Producer Process                           │
//! │                                                                         │
//! │  env ──► ProducerConfig ──► metadata ──► publish loop ──► flush/close  │
//! │                                │               ▲                        │
//! │                        broker unreachable   Ctrl+C / SIGTERM            │
//! │                             exit 1                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use event_producer::Producer;
use till_link::{KafkaPublisher, ProducerConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;

    runtime.block_on(run())
}

async fn run() -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting event producer");

    let config = ProducerConfig::load().context("loading configuration")?;
    info!(
        bootstrap_servers = %config.bootstrap_servers.join(","),
        topic = %config.topic,
        messages_per_second = config.messages_per_second,
        publish_retries = config.publish_retries,
        "Configuration loaded"
    );

    let interval = config.publish_interval();
    let mut publisher = KafkaPublisher::new(config);
    publisher
        .connect()
        .await
        .context("fetching topic metadata")?;
    info!(
        topic = publisher.topic(),
        partitions = publisher.partition_count().unwrap_or(0),
        "Connected to Kafka"
    );

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    let mut producer = Producer::new(publisher, interval);
    producer.run(&mut shutdown_rx).await;

    info!("Event producer shutdown complete");
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
