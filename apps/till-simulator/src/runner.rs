//! # Simulation Runner
//!
//! Owns every piece of run state: the generator, the API client, the
//! recency window and the counters. Nothing is shared, nothing is locked.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   TESTING ── failed <= allowed ──► RUNNING ── interrupt ──► TERMINATED  │
//! │      │                                                                  │
//! │      └────── failed > allowed ───► ABORTED                              │
//! │                                                                         │
//! │   RUNNING iteration:                                                    │
//! │     generate ─► validate record ─► submit ─► diagnostics ─► verdict     │
//! │        │              │               │                       │         │
//! │        │          invalid: skip   transport error        accept/reject  │
//! │        ▼                                                                │
//! │     every 10 attempts log stats, every 50 re-probe stats endpoint       │
//! │     sleep(interval) or interrupt                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use till_core::response::{validate_response, ValidationPolicy, ValidationVerdict};
use till_core::validation::validate_record;
use till_core::{RecencySet, TransactionGenerator, TransactionRecord, ValidationError};
use till_link::{diagnostics, ApiClient, LinkError, LinkResult, RawResponse, SimulatorConfig};

use crate::probes::{self, SelfTestReport};
use crate::stats::RunStats;

/// Attempts between statistics log lines.
pub const STATS_LOG_EVERY: u64 = 10;

/// Attempts between stats endpoint probes.
pub const STATS_PROBE_EVERY: u64 = 50;

/// Longest error body echoed to the log when it is not JSON.
const MAX_LOGGED_BODY: usize = 500;

// =============================================================================
// Run State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Testing,
    Running,
    Terminated,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Testing => "TESTING",
            RunState::Running => "RUNNING",
            RunState::Terminated => "TERMINATED",
            RunState::Aborted => "ABORTED",
        })
    }
}

/// What happened to one generated transaction.
#[derive(Debug)]
pub enum Outcome {
    Accepted { duplicate: bool },
    Rejected(ValidationVerdict),
    InvalidRecord(ValidationError),
    TransportFailed(LinkError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Accepted { .. })
    }
}

// =============================================================================
// Simulator
// =============================================================================

pub struct Simulator {
    config: SimulatorConfig,
    client: ApiClient,
    policy: ValidationPolicy,
    generator: TransactionGenerator,
    recency: RecencySet,
    stats: RunStats,
    state: RunState,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> LinkResult<Self> {
        config.validate()?;
        let client = ApiClient::new(config.api_base_url.clone())?;

        Ok(Simulator {
            policy: config.validation_policy(),
            config,
            client,
            generator: TransactionGenerator::from_entropy(),
            recency: RecencySet::default(),
            stats: RunStats::default(),
            state: RunState::Testing,
        })
    }

    /// Replaces the generator, e.g. with a seeded one.
    pub fn with_generator(mut self, generator: TransactionGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// TESTING: runs the probes and moves to RUNNING or ABORTED.
    pub async fn self_test(&mut self) -> SelfTestReport {
        self.state = RunState::Testing;
        let allowed = self.config.selftest_allowed_failures;

        let report =
            probes::run_self_test(&self.client, &self.config.stats_store_id, &self.policy).await;
        report.log(allowed);

        self.state = if report.gate(allowed) {
            RunState::Running
        } else {
            RunState::Aborted
        };
        info!(state = %self.state, "Self-test complete");

        report
    }

    /// RUNNING: submits transactions until an interrupt arrives.
    pub async fn run(&mut self, shutdown_rx: &mut mpsc::Receiver<()>) -> RunState {
        if self.state != RunState::Running {
            warn!(state = %self.state, "Simulation not started");
            return self.state;
        }

        info!(
            api = self.client.base_url(),
            interval_ms = self.config.interval.as_millis() as u64,
            "Starting transaction simulation"
        );

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Interrupt received");
                break;
            }

            self.run_once().await;

            let attempts = self.stats.total();
            if attempts % STATS_LOG_EVERY == 0 {
                self.stats.log("Running");
            }
            if attempts % STATS_PROBE_EVERY == 0 {
                self.probe_stats().await;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                Some(()) = shutdown_rx.recv() => {
                    info!("Interrupt received");
                    break;
                }
            }
        }

        self.state = RunState::Terminated;
        self.stats.log("Final");
        info!(state = %self.state, "Simulation stopped");
        self.state
    }

    /// Generates and submits one transaction.
    pub async fn run_once(&mut self) -> Outcome {
        let record = self.generator.generate();
        self.submit_record(&record).await
    }

    /// Validates, submits and judges one record.
    pub async fn submit_record(&mut self, record: &TransactionRecord) -> Outcome {
        let id = record.transaction_id.as_str();

        if let Err(e) = validate_record(record) {
            error!(
                transaction_id = id,
                error = %e,
                "Record failed pre-submission validation, skipped"
            );
            self.stats.record_failure("invalid-record");
            return Outcome::InvalidRecord(e);
        }

        info!(
            transaction_id = id,
            store_id = %record.store_id,
            till_id = %record.till_id,
            amount = %record.total_amount,
            items = record.items.len(),
            payment_method = %record.payment_method,
            "Submitting transaction"
        );

        let response = match self.client.submit(record).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    transaction_id = id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Transport error"
                );
                self.stats.record_failure("transport");
                return Outcome::TransportFailed(e);
            }
        };

        diagnostics::report(id, &diagnostics::inspect(&response));
        if matches!(response.status, 400 | 500) {
            log_error_body(id, &response);
        }

        let verdict =
            validate_response(record, response.status, &response.body, Utc::now(), &self.policy);

        if !verdict.accepted {
            for reason in &verdict.reasons {
                error!(
                    transaction_id = id,
                    status = response.status,
                    code = reason.code(),
                    reason = %reason,
                    "Response rejected"
                );
            }
            let code = verdict.first_reason().map(|r| r.code()).unwrap_or("rejected");
            self.stats.record_failure(code);
            return Outcome::Rejected(verdict);
        }

        let duplicate = self.recency.insert(id);
        if duplicate {
            warn!(transaction_id = id, "Transaction id accepted before");
            self.stats.duplicates += 1;
        }

        info!(
            transaction_id = id,
            elapsed_ms = response.elapsed.as_millis() as u64,
            "Transaction accepted"
        );
        self.stats.record_success();
        Outcome::Accepted { duplicate }
    }

    async fn probe_stats(&mut self) {
        self.stats.stats_probes += 1;
        match probes::probe_stats(&self.client, &self.config.stats_store_id).await {
            Ok(detail) => debug!(detail = %detail, "Stats probe passed"),
            Err(detail) => warn!(detail = %detail, "Stats probe failed"),
        }
    }
}

/// Logs what the API said about a 400 or 500.
fn log_error_body(transaction_id: &str, response: &RawResponse) {
    match response.json() {
        Some(body) => {
            let field = |name: &str| {
                body.get(name)
                    .and_then(Value::as_str)
                    .unwrap_or("-")
                    .to_string()
            };
            error!(
                transaction_id,
                status = response.status,
                message = %field("message"),
                error = %field("error"),
                "API returned an error"
            );
        }
        None => {
            let text: String = response.body.chars().take(MAX_LOGGED_BODY).collect();
            error!(
                transaction_id,
                status = response.status,
                body = %text,
                "API returned an error"
            );
        }
    }
}
