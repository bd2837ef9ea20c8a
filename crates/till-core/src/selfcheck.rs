//! # Self-Check Fixtures
//!
//! Canned data for the startup self-test: the probe record posted to the
//! live API, the deliberately broken request the API must refuse, and the
//! bypass suite that proves the response validator cannot be fooled by a
//! minimal or degenerate response.

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::money::Money;
use crate::response::{validate_response_for_id, ValidationPolicy, ValidationVerdict};
use crate::types::{LineItem, PaymentMethod, TransactionRecord, CURRENCY_GBP};

/// Transaction id used by the submit probe and the bypass suite.
pub const PROBE_TRANSACTION_ID: &str = "TXN-TEST001";

/// The fixed single-line record posted by the submit probe.
pub fn probe_record(now: DateTime<Utc>) -> TransactionRecord {
    TransactionRecord {
        transaction_id: PROBE_TRANSACTION_ID.to_string(),
        customer_id: "CUST-12345".to_string(),
        store_id: "STORE-001".to_string(),
        till_id: "TILL-1".to_string(),
        payment_method: PaymentMethod::Card,
        total_amount: Money::from_pence(599),
        currency: CURRENCY_GBP.to_string(),
        timestamp: now,
        items: vec![LineItem {
            product_name: "Test Product".to_string(),
            product_code: "TEST001".to_string(),
            unit_price: Money::from_pence(599),
            quantity: 1,
            category: "Test".to_string(),
        }],
    }
}

/// A submit body missing most required fields; the API must answer 400.
pub fn incomplete_submit_body() -> Value {
    json!({
        "transactionId": "TXN-TEST002",
        "customerId": "CUST-12345",
    })
}

/// A submit body that is not JSON at all; the API must answer 400.
pub const NON_JSON_SUBMIT_BODY: &str = "invalid json";

// =============================================================================
// Bypass Suite
// =============================================================================

/// One canned response and the verdict it must get.
#[derive(Debug, Clone)]
pub struct BypassFixture {
    pub name: &'static str,
    pub status: u16,
    pub body: Value,
    pub expect_reject: bool,
}

/// Result of running one fixture.
#[derive(Debug, Clone)]
pub struct FixtureResult {
    pub name: &'static str,
    pub expect_reject: bool,
    pub verdict: ValidationVerdict,
}

impl FixtureResult {
    pub fn passed(&self) -> bool {
        self.verdict.accepted != self.expect_reject
    }
}

/// Outcome of the whole bypass suite.
#[derive(Debug, Clone)]
pub struct SuiteOutcome {
    pub results: Vec<FixtureResult>,
}

impl SuiteOutcome {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// True only if every fixture got its expected verdict.
    pub fn all_passed(&self) -> bool {
        self.passed_count() == self.total()
    }
}

const STALE: &str = "2024-01-01T00:00:00Z";
const GOOD_MESSAGE: &str = "Transaction processed successfully";

/// The twelve fixtures, with time-relative timestamps anchored at `now`.
pub fn bypass_fixtures(now: DateTime<Utc>) -> Vec<BypassFixture> {
    let fixture = |name, body, expect_reject| BypassFixture {
        name,
        status: 200,
        body,
        expect_reject,
    };

    vec![
        fixture("Empty response body", json!({}), true),
        fixture("Minimal success response", json!({"status": "success"}), true),
        fixture(
            "Missing transactionId",
            json!({"status": "success", "message": GOOD_MESSAGE, "timestamp": STALE}),
            true,
        ),
        fixture(
            "Wrong transactionId",
            json!({"status": "success", "message": GOOD_MESSAGE,
                   "transactionId": "WRONG-ID", "timestamp": STALE}),
            true,
        ),
        fixture(
            "Invalid status",
            json!({"status": "ok", "message": GOOD_MESSAGE,
                   "transactionId": PROBE_TRANSACTION_ID, "timestamp": STALE}),
            true,
        ),
        fixture(
            "Empty message",
            json!({"status": "success", "message": "",
                   "transactionId": PROBE_TRANSACTION_ID, "timestamp": STALE}),
            true,
        ),
        fixture(
            "Message without success",
            json!({"status": "success", "message": "Transaction completed",
                   "transactionId": PROBE_TRANSACTION_ID, "timestamp": STALE}),
            true,
        ),
        fixture(
            "Invalid timestamp format",
            json!({"status": "success", "message": GOOD_MESSAGE,
                   "transactionId": PROBE_TRANSACTION_ID, "timestamp": "invalid-date"}),
            true,
        ),
        fixture(
            "Future timestamp",
            json!({"status": "success", "message": GOOD_MESSAGE,
                   "transactionId": PROBE_TRANSACTION_ID,
                   "timestamp": (now + Duration::days(3650)).to_rfc3339()}),
            true,
        ),
        fixture(
            "Extra fields",
            json!({"status": "success", "message": GOOD_MESSAGE,
                   "transactionId": PROBE_TRANSACTION_ID, "timestamp": STALE,
                   "extra": "field"}),
            true,
        ),
        fixture(
            "Wrong data types",
            json!({"status": 200, "message": 123, "transactionId": 456, "timestamp": 789}),
            true,
        ),
        fixture(
            "Valid response",
            json!({"status": "success", "message": GOOD_MESSAGE,
                   "transactionId": PROBE_TRANSACTION_ID, "timestamp": now.to_rfc3339()}),
            false,
        ),
    ]
}

/// Runs every fixture through the validator.
pub fn run_bypass_suite(now: DateTime<Utc>, policy: &ValidationPolicy) -> SuiteOutcome {
    let results = bypass_fixtures(now)
        .into_iter()
        .map(|fixture| FixtureResult {
            name: fixture.name,
            expect_reject: fixture.expect_reject,
            verdict: validate_response_for_id(
                PROBE_TRANSACTION_ID,
                fixture.status,
                &fixture.body.to_string(),
                now,
                policy,
            ),
        })
        .collect();

    SuiteOutcome { results }
}
