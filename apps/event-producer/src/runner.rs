//! # Producer Loop
//!
//! Generates an event, publishes it, logs the acknowledgement, sleeps
//! `1 / MESSAGES_PER_SECOND` and repeats until interrupted. A failed publish
//! is counted and the loop moves on.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info};

use till_core::{TransactionEvent, TransactionGenerator};
use till_link::{KafkaPublisher, LinkResult, PublishAck};

/// Attempts between statistics log lines.
pub const STATS_LOG_EVERY: u64 = 50;

// =============================================================================
// Event Sink
// =============================================================================

/// Where published events go.
#[allow(async_fn_in_trait)]
pub trait EventSink {
    /// Publishes one event and waits for its acknowledgement.
    async fn publish(&mut self, event: &TransactionEvent) -> LinkResult<PublishAck>;

    async fn flush(&mut self) -> LinkResult<()>;

    fn close(&mut self);
}

impl EventSink for KafkaPublisher {
    async fn publish(&mut self, event: &TransactionEvent) -> LinkResult<PublishAck> {
        KafkaPublisher::publish(self, event).await
    }

    async fn flush(&mut self) -> LinkResult<()> {
        KafkaPublisher::flush(self).await
    }

    fn close(&mut self) {
        KafkaPublisher::close(self)
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub published: u64,
    pub failed: u64,
}

impl PublishStats {
    pub fn total(&self) -> u64 {
        self.published + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.published as f64 / total as f64 * 100.0,
        }
    }

    pub fn log(&self, label: &str) {
        info!(
            total = self.total(),
            published = self.published,
            failed = self.failed,
            success_rate = %format_args!("{:.1}%", self.success_rate()),
            "{label} statistics"
        );
    }
}

// =============================================================================
// Producer
// =============================================================================

pub struct Producer<S: EventSink> {
    sink: S,
    generator: TransactionGenerator,
    interval: Duration,
    stats: PublishStats,
}

impl<S: EventSink> Producer<S> {
    pub fn new(sink: S, interval: Duration) -> Self {
        Producer {
            sink,
            generator: TransactionGenerator::from_entropy(),
            interval,
            stats: PublishStats::default(),
        }
    }

    pub fn with_generator(mut self, generator: TransactionGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn stats(&self) -> &PublishStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Publishes until an interrupt arrives, then flushes and closes the sink.
    pub async fn run(&mut self, shutdown_rx: &mut mpsc::Receiver<()>) -> PublishStats {
        info!(interval_ms = self.interval.as_millis() as u64, "Starting event production");

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Interrupt received");
                break;
            }

            self.publish_next().await;

            if self.stats.total() % STATS_LOG_EVERY == 0 {
                self.stats.log("Running");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                Some(()) = shutdown_rx.recv() => {
                    info!("Interrupt received");
                    break;
                }
            }
        }

        if let Err(e) = self.sink.flush().await {
            error!(error = %e, "Flush failed");
        }
        self.sink.close();
        self.stats.log("Final");

        self.stats.clone()
    }

    /// Generates and publishes one event.
    pub async fn publish_next(&mut self) -> Option<PublishAck> {
        let event = self.generator.generate_event();
        let record = &event.data;

        match self.sink.publish(&event).await {
            Ok(ack) => {
                info!(
                    topic = %ack.topic,
                    partition = ack.partition,
                    offset = ack.offset,
                    transaction_id = %record.transaction_id,
                    store_id = %record.store_id,
                    till_id = %record.till_id,
                    amount = %record.total_amount,
                    "Event published"
                );
                self.stats.published += 1;
                Some(ack)
            }
            Err(e) => {
                error!(
                    transaction_id = %record.transaction_id,
                    error = %e,
                    "Failed to publish event"
                );
                self.stats.failed += 1;
                None
            }
        }
    }
}
