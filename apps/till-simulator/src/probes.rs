//! # Startup Self-Test
//!
//! Five probes run before the first real transaction is sent:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  health          GET health → 200, status "UP"                          │
//! │  submit          POST TXN-TEST001 → 200, four fields, id echoed         │
//! │  error handling  POST incomplete record → 400 status "error"            │
//! │                  POST non-JSON body     → 400                           │
//! │  stats           GET stats/{store} → 200, four stats fields             │
//! │  bypass suite    12 canned responses through the validator              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The run proceeds only if `failed <= allowed_failures`.

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use till_core::response::{ValidationPolicy, RESPONSE_FIELDS};
use till_core::selfcheck::{
    incomplete_submit_body, probe_record, run_bypass_suite, NON_JSON_SUBMIT_BODY,
    PROBE_TRANSACTION_ID,
};
use till_link::{ApiClient, RawResponse};

/// Fields the stats endpoint must return.
pub const STATS_FIELDS: [&str; 4] = ["storeId", "totalTransactions", "totalAmount", "averageAmount"];

// =============================================================================
// Results
// =============================================================================

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl ProbeResult {
    fn from_check(name: &'static str, check: Result<String, String>) -> Self {
        match check {
            Ok(detail) => ProbeResult {
                name,
                passed: true,
                detail,
            },
            Err(detail) => ProbeResult {
                name,
                passed: false,
                detail,
            },
        }
    }
}

/// All probe results from one self-test.
#[derive(Debug, Clone, Default)]
pub struct SelfTestReport {
    pub results: Vec<ProbeResult>,
}

impl SelfTestReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// Whether the run may start.
    pub fn gate(&self, allowed_failures: usize) -> bool {
        self.failed() <= allowed_failures
    }

    pub fn result(&self, name: &str) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Logs the results table and the summary banner.
    pub fn log(&self, allowed_failures: usize) {
        info!("┌────────────────────┬────────┬──────────────────────────────────────");
        info!("│ {:<18} │ {:<6} │ detail", "probe", "result");
        info!("├────────────────────┼────────┼──────────────────────────────────────");
        for r in &self.results {
            let mark = if r.passed { "PASS" } else { "FAIL" };
            info!("│ {:<18} │ {:<6} │ {}", r.name, mark, r.detail);
        }
        info!("└────────────────────┴────────┴──────────────────────────────────────");

        let banner = "═".repeat(60);
        info!("{banner}");
        info!("VALIDATION SUMMARY");
        info!(
            passed = self.passed(),
            failed = self.failed(),
            allowed_failures,
            "{} of {} probes passed",
            self.passed(),
            self.results.len()
        );
        if self.gate(allowed_failures) {
            info!("Self-test gate passed, starting simulation");
        } else {
            error!("Self-test gate failed, refusing to start");
        }
        info!("{banner}");
    }
}

// =============================================================================
// Probes
// =============================================================================

pub const HEALTH: &str = "health";
pub const SUBMIT: &str = "submit";
pub const ERROR_HANDLING: &str = "error handling";
pub const STATS: &str = "stats";
pub const BYPASS: &str = "bypass suite";

/// Runs every probe in order.
pub async fn run_self_test(
    client: &ApiClient,
    stats_store_id: &str,
    policy: &ValidationPolicy,
) -> SelfTestReport {
    info!(api = client.base_url(), "Running self-test");

    let results = vec![
        ProbeResult::from_check(HEALTH, probe_health(client).await),
        ProbeResult::from_check(SUBMIT, probe_submit(client).await),
        ProbeResult::from_check(ERROR_HANDLING, probe_error_handling(client).await),
        ProbeResult::from_check(STATS, probe_stats(client, stats_store_id).await),
        ProbeResult::from_check(BYPASS, probe_bypass(policy)),
    ];

    for r in results.iter().filter(|r| !r.passed) {
        warn!(probe = r.name, detail = %r.detail, "Self-test probe failed");
    }

    SelfTestReport { results }
}

pub async fn probe_health(client: &ApiClient) -> Result<String, String> {
    let response = client.health().await.map_err(|e| e.to_string())?;
    expect_status(&response, 200)?;

    let body = parse_object(&response)?;
    match body.get("status").and_then(Value::as_str) {
        Some("UP") => Ok("status UP".into()),
        other => Err(format!("expected status \"UP\", got {other:?}")),
    }
}

pub async fn probe_submit(client: &ApiClient) -> Result<String, String> {
    let record = probe_record(Utc::now());
    let response = client.submit(&record).await.map_err(|e| e.to_string())?;
    expect_status(&response, 200)?;

    let body = parse_object(&response)?;
    let missing: Vec<&str> = RESPONSE_FIELDS
        .into_iter()
        .filter(|field| body.get(*field).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing fields: {}", missing.join(", ")));
    }

    if body["status"] != "success" {
        return Err(format!("expected status \"success\", got {}", body["status"]));
    }
    if body["transactionId"] != PROBE_TRANSACTION_ID {
        return Err(format!(
            "transactionId not echoed: sent {PROBE_TRANSACTION_ID}, got {}",
            body["transactionId"]
        ));
    }

    Ok(format!("{PROBE_TRANSACTION_ID} accepted"))
}

/// The API must refuse an incomplete record and a non-JSON body.
pub async fn probe_error_handling(client: &ApiClient) -> Result<String, String> {
    let response = client
        .submit_json(&incomplete_submit_body())
        .await
        .map_err(|e| format!("incomplete record: {e}"))?;
    expect_status(&response, 400).map_err(|e| format!("incomplete record: {e}"))?;
    let body = parse_object(&response).map_err(|e| format!("incomplete record: {e}"))?;
    if body.get("status").and_then(Value::as_str) != Some("error") {
        return Err(format!(
            "incomplete record: expected status \"error\", got {}",
            body.get("status").unwrap_or(&Value::Null)
        ));
    }

    let response = client
        .submit_raw(NON_JSON_SUBMIT_BODY)
        .await
        .map_err(|e| format!("non-JSON body: {e}"))?;
    expect_status(&response, 400).map_err(|e| format!("non-JSON body: {e}"))?;

    Ok("incomplete and non-JSON requests refused".into())
}

pub async fn probe_stats(client: &ApiClient, store_id: &str) -> Result<String, String> {
    let response = client.stats(store_id).await.map_err(|e| e.to_string())?;
    expect_status(&response, 200)?;

    let body = parse_object(&response)?;
    let missing: Vec<&str> = STATS_FIELDS
        .into_iter()
        .filter(|field| body.get(*field).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing fields: {}", missing.join(", ")));
    }

    Ok(format!(
        "{} transactions for {}",
        body["totalTransactions"], store_id
    ))
}

/// Proves the validator rejects every degenerate fixture.
pub fn probe_bypass(policy: &ValidationPolicy) -> Result<String, String> {
    let outcome = run_bypass_suite(Utc::now(), policy);

    for result in outcome.results.iter().filter(|r| !r.passed()) {
        error!(
            fixture = result.name,
            expected = if result.expect_reject { "reject" } else { "accept" },
            codes = ?result.verdict.codes(),
            "Bypass fixture got the wrong verdict"
        );
    }

    let summary = format!("{}/{} fixtures", outcome.passed_count(), outcome.total());
    if outcome.all_passed() {
        Ok(summary)
    } else {
        Err(summary)
    }
}

fn expect_status(response: &RawResponse, expected: u16) -> Result<(), String> {
    if response.status == expected {
        Ok(())
    } else {
        Err(format!("expected HTTP {expected}, got {}", response.status))
    }
}

fn parse_object(response: &RawResponse) -> Result<serde_json::Map<String, Value>, String> {
    match response.json() {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err("body is not a JSON object".into()),
        None => Err("body is not JSON".into()),
    }
}
