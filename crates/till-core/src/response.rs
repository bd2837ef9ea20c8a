//! # Response Validation
//!
//! Decides whether a submit response from the transactions API is genuine.
//!
//! ## Decision Procedure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (record, status, body, now)                                            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  1. HTTP status == 200 ............................ status-error        │
//! │  2. body is a JSON object ......................... malformed-body      │
//! │  3. keys == {status,message,transactionId,timestamp}                    │
//! │        missing first, then extra .................. missing-fields      │
//! │                                                     unexpected-fields   │
//! │  4. all four values are strings ................... wrong-type          │
//! │  5. status == "success" ........................... bad-status          │
//! │  6. message: non-empty, "success", >= 10 chars .... bad-message         │
//! │  7. transactionId echoes the record, TXN- prefix .. id-mismatch         │
//! │                                                     bad-id-format       │
//! │  8. timestamp ISO-8601, not future, <= 300 s old .. bad-timestamp-format│
//! │                                                     future-timestamp    │
//! │                                                     stale-timestamp     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │     ACCEPT                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first failing check wins: a rejected verdict carries exactly one
//! reason. The function is pure; `now` is an input and nothing is logged or
//! recorded here. Recording accepted ids is the caller's job.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

use crate::types::{TransactionRecord, TRANSACTION_ID_PREFIX};

/// Field names a submit response must carry, no more and no less.
pub const RESPONSE_FIELDS: [&str; 4] = ["status", "message", "transactionId", "timestamp"];

// =============================================================================
// Policy
// =============================================================================

/// Tunables for the decision procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Literal the `status` field must equal.
    pub expected_status: String,
    /// Minimum trimmed length of `message`, in characters.
    pub min_message_len: usize,
    /// Word `message` must contain (case-insensitive).
    pub message_keyword: String,
    /// Prefix every echoed transaction id must carry.
    pub id_prefix: String,
    /// Oldest acceptable response timestamp (inclusive).
    pub max_age: Duration,
    /// How far ahead of `now` a timestamp may be.
    pub allowed_future_skew: Duration,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        ValidationPolicy {
            expected_status: "success".to_string(),
            min_message_len: 10,
            message_keyword: "success".to_string(),
            id_prefix: TRANSACTION_ID_PREFIX.to_string(),
            max_age: Duration::seconds(300),
            allowed_future_skew: Duration::zero(),
        }
    }
}

impl ValidationPolicy {
    pub fn with_max_age_secs(mut self, secs: i64) -> Self {
        self.max_age = Duration::seconds(secs);
        self
    }
}

// =============================================================================
// Reasons
// =============================================================================

/// How a non-200 status is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    BadRequest,
    NotFound,
    ServerError,
    Unavailable,
    Unexpected,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => StatusClass::BadRequest,
            404 => StatusClass::NotFound,
            500 => StatusClass::ServerError,
            503 => StatusClass::Unavailable,
            _ => StatusClass::Unexpected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::BadRequest => "bad-request",
            StatusClass::NotFound => "not-found",
            StatusClass::ServerError => "server-error",
            StatusClass::Unavailable => "unavailable",
            StatusClass::Unexpected => "unexpected-status",
        }
    }
}

/// What is wrong with the `message` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageProblem {
    Empty,
    TooShort { len: usize, min: usize },
    MissingKeyword { keyword: String },
}

impl MessageProblem {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageProblem::Empty => "empty",
            MessageProblem::TooShort { .. } => "too-short",
            MessageProblem::MissingKeyword { .. } => "missing-keyword",
        }
    }
}

/// Why a response was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Status { status: u16, class: StatusClass },
    MalformedBody { detail: String },
    MissingFields { fields: Vec<String> },
    UnexpectedFields { fields: Vec<String> },
    WrongType { field: &'static str, found: &'static str },
    BadStatus { found: String },
    BadMessage(MessageProblem),
    IdMismatch { expected: String, found: String },
    BadIdFormat { found: String },
    BadTimestampFormat { found: String },
    FutureTimestamp { ahead: Duration },
    StaleTimestamp { age: Duration },
}

impl RejectReason {
    /// Stable reason code for logs and tallies.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::Status { .. } => "status-error",
            RejectReason::MalformedBody { .. } => "malformed-body",
            RejectReason::MissingFields { .. } => "missing-fields",
            RejectReason::UnexpectedFields { .. } => "unexpected-fields",
            RejectReason::WrongType { .. } => "wrong-type",
            RejectReason::BadStatus { .. } => "bad-status",
            RejectReason::BadMessage(_) => "bad-message",
            RejectReason::IdMismatch { .. } => "id-mismatch",
            RejectReason::BadIdFormat { .. } => "bad-id-format",
            RejectReason::BadTimestampFormat { .. } => "bad-timestamp-format",
            RejectReason::FutureTimestamp { .. } => "future-timestamp",
            RejectReason::StaleTimestamp { .. } => "stale-timestamp",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Status { status, class } => {
                write!(f, "status-error/{}: HTTP {}", class.as_str(), status)
            }
            RejectReason::MalformedBody { detail } => write!(f, "malformed-body: {detail}"),
            RejectReason::MissingFields { fields } => {
                write!(f, "missing-fields: {}", fields.join(", "))
            }
            RejectReason::UnexpectedFields { fields } => {
                write!(f, "unexpected-fields: {}", fields.join(", "))
            }
            RejectReason::WrongType { field, found } => {
                write!(f, "wrong-type: {field} must be a string, found {found}")
            }
            RejectReason::BadStatus { found } => write!(f, "bad-status: {found:?}"),
            RejectReason::BadMessage(problem) => match problem {
                MessageProblem::Empty => f.write_str("bad-message/empty"),
                MessageProblem::TooShort { len, min } => {
                    write!(f, "bad-message/too-short: {len} < {min} characters")
                }
                MessageProblem::MissingKeyword { keyword } => {
                    write!(f, "bad-message/missing-keyword: no {keyword:?}")
                }
            },
            RejectReason::IdMismatch { expected, found } => {
                write!(f, "id-mismatch: expected {expected}, got {found}")
            }
            RejectReason::BadIdFormat { found } => write!(f, "bad-id-format: {found}"),
            RejectReason::BadTimestampFormat { found } => {
                write!(f, "bad-timestamp-format: {found:?}")
            }
            RejectReason::FutureTimestamp { ahead } => {
                write!(f, "future-timestamp: {} ms ahead", ahead.num_milliseconds())
            }
            RejectReason::StaleTimestamp { age } => {
                write!(f, "stale-timestamp: {} ms old", age.num_milliseconds())
            }
        }
    }
}

// =============================================================================
// Verdict
// =============================================================================

/// Outcome of validating one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub accepted: bool,
    pub reasons: Vec<RejectReason>,
}

impl ValidationVerdict {
    pub fn accept() -> Self {
        ValidationVerdict {
            accepted: true,
            reasons: Vec::new(),
        }
    }

    pub fn reject(reason: RejectReason) -> Self {
        ValidationVerdict {
            accepted: false,
            reasons: vec![reason],
        }
    }

    pub fn first_reason(&self) -> Option<&RejectReason> {
        self.reasons.first()
    }

    /// Reason codes in order.
    pub fn codes(&self) -> Vec<&'static str> {
        self.reasons.iter().map(RejectReason::code).collect()
    }
}

impl From<Result<(), RejectReason>> for ValidationVerdict {
    fn from(result: Result<(), RejectReason>) -> Self {
        match result {
            Ok(()) => ValidationVerdict::accept(),
            Err(reason) => ValidationVerdict::reject(reason),
        }
    }
}

// =============================================================================
// Decision Function
// =============================================================================

/// Validates a submit response against the record that produced it.
pub fn validate_response(
    record: &TransactionRecord,
    status: u16,
    body: &str,
    now: DateTime<Utc>,
    policy: &ValidationPolicy,
) -> ValidationVerdict {
    check(&record.transaction_id, status, body, now, policy).into()
}

/// Same procedure with only the submitted id; used by the self-check suite.
pub fn validate_response_for_id(
    expected_id: &str,
    status: u16,
    body: &str,
    now: DateTime<Utc>,
    policy: &ValidationPolicy,
) -> ValidationVerdict {
    check(expected_id, status, body, now, policy).into()
}

fn check(
    expected_id: &str,
    status: u16,
    body: &str,
    now: DateTime<Utc>,
    policy: &ValidationPolicy,
) -> Result<(), RejectReason> {
    if status != 200 {
        return Err(RejectReason::Status {
            status,
            class: StatusClass::from_status(status),
        });
    }

    let object = parse_object(body)?;
    check_field_set(&object)?;

    let status_field = string_field(&object, "status")?;
    let message = string_field(&object, "message")?;
    let transaction_id = string_field(&object, "transactionId")?;
    let timestamp = string_field(&object, "timestamp")?;

    if status_field != policy.expected_status {
        return Err(RejectReason::BadStatus {
            found: status_field.to_string(),
        });
    }

    check_message(message, policy)?;

    if transaction_id != expected_id {
        return Err(RejectReason::IdMismatch {
            expected: expected_id.to_string(),
            found: transaction_id.to_string(),
        });
    }
    if !transaction_id.starts_with(&policy.id_prefix) {
        return Err(RejectReason::BadIdFormat {
            found: transaction_id.to_string(),
        });
    }

    check_timestamp(timestamp, now, policy)
}

fn parse_object(body: &str) -> Result<Map<String, Value>, RejectReason> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RejectReason::MalformedBody {
            detail: format!("expected a JSON object, found {}", json_type_name(&other)),
        }),
        Err(e) => Err(RejectReason::MalformedBody {
            detail: e.to_string(),
        }),
    }
}

fn check_field_set(object: &Map<String, Value>) -> Result<(), RejectReason> {
    let expected: BTreeSet<&str> = RESPONSE_FIELDS.into_iter().collect();
    let actual: BTreeSet<&str> = object.keys().map(String::as_str).collect();

    let missing: Vec<String> = expected.difference(&actual).map(|s| s.to_string()).collect();
    if !missing.is_empty() {
        return Err(RejectReason::MissingFields { fields: missing });
    }

    let extra: Vec<String> = actual.difference(&expected).map(|s| s.to_string()).collect();
    if !extra.is_empty() {
        return Err(RejectReason::UnexpectedFields { fields: extra });
    }

    Ok(())
}

fn string_field<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, RejectReason> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(RejectReason::WrongType {
            field,
            found: json_type_name(other),
        }),
        None => Err(RejectReason::MissingFields {
            fields: vec![field.to_string()],
        }),
    }
}

fn check_message(message: &str, policy: &ValidationPolicy) -> Result<(), RejectReason> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(RejectReason::BadMessage(MessageProblem::Empty));
    }

    if !trimmed
        .to_lowercase()
        .contains(&policy.message_keyword.to_lowercase())
    {
        return Err(RejectReason::BadMessage(MessageProblem::MissingKeyword {
            keyword: policy.message_keyword.clone(),
        }));
    }

    let len = trimmed.chars().count();
    if len < policy.min_message_len {
        return Err(RejectReason::BadMessage(MessageProblem::TooShort {
            len,
            min: policy.min_message_len,
        }));
    }

    Ok(())
}

fn check_timestamp(
    raw: &str,
    now: DateTime<Utc>,
    policy: &ValidationPolicy,
) -> Result<(), RejectReason> {
    let parsed = parse_iso_timestamp(raw).ok_or_else(|| RejectReason::BadTimestampFormat {
        found: raw.to_string(),
    })?;

    let age = now - parsed;
    if age < -policy.allowed_future_skew {
        return Err(RejectReason::FutureTimestamp { ahead: -age });
    }
    if age > policy.max_age {
        return Err(RejectReason::StaleTimestamp { age });
    }
    Ok(())
}

/// ISO-8601 forms accepted beyond RFC 3339: seconds may be omitted and the
/// offset may drop its colon. The offset itself is always required.
const ISO_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Parses an offset-qualified ISO-8601 timestamp. A trailing `Z` means UTC.
fn parse_iso_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let normalized = match raw.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => raw.to_string(),
    };
    ISO_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&normalized, format).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// JSON type name as reported in `wrong-type` reasons.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::TransactionGenerator;
    use chrono::{SecondsFormat, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record() -> TransactionRecord {
        let mut record = TransactionGenerator::seeded(21).generate_at(now());
        record.transaction_id = "TXN-ABCD1234".to_string();
        record
    }

    fn good_body() -> Value {
        json!({
            "status": "success",
            "message": "Transaction processed successfully",
            "transactionId": "TXN-ABCD1234",
            "timestamp": now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    fn verdict_for(body: &Value) -> ValidationVerdict {
        validate_response(
            &record(),
            200,
            &body.to_string(),
            now(),
            &ValidationPolicy::default(),
        )
    }

    fn code_for(body: &Value) -> &'static str {
        let verdict = verdict_for(body);
        assert!(!verdict.accepted, "expected rejection for {body}");
        assert_eq!(verdict.reasons.len(), 1);
        verdict.reasons[0].code()
    }

    #[test]
    fn test_valid_response_accepted() {
        let verdict = verdict_for(&good_body());
        assert!(verdict.accepted);
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_offset_and_zulu_timestamps_accepted() {
        let mut body = good_body();
        body["timestamp"] = json!("2024-06-01T12:59:00+01:00");
        assert!(verdict_for(&body).accepted);

        body["timestamp"] = json!("2024-06-01T11:58:30.123456Z");
        assert!(verdict_for(&body).accepted);

        for iso in [
            "2024-06-01T12:00+00:00",
            "2024-06-01T12:00Z",
            "2024-06-01T11:59:30+0000",
            "2024-06-01T12:59:30.5+0100",
            "2024-06-01 11:59:30+00:00",
        ] {
            body["timestamp"] = json!(iso);
            assert!(verdict_for(&body).accepted, "timestamp {iso:?}");
        }
    }

    #[test]
    fn test_non_200_statuses() {
        let cases = [
            (400, StatusClass::BadRequest),
            (404, StatusClass::NotFound),
            (500, StatusClass::ServerError),
            (503, StatusClass::Unavailable),
            (418, StatusClass::Unexpected),
            (201, StatusClass::Unexpected),
        ];
        for (status, class) in cases {
            let verdict = validate_response(
                &record(),
                status,
                &good_body().to_string(),
                now(),
                &ValidationPolicy::default(),
            );
            assert_eq!(
                verdict.first_reason(),
                Some(&RejectReason::Status { status, class })
            );
        }
    }

    #[test]
    fn test_malformed_bodies() {
        let policy = ValidationPolicy::default();
        for body in ["", "not json", "[1,2]", "\"success\"", "null", "{\"status\":"] {
            let verdict = validate_response(&record(), 200, body, now(), &policy);
            assert_eq!(verdict.codes(), vec!["malformed-body"], "body {body:?}");
        }
    }

    #[test]
    fn test_empty_object_reports_all_missing_sorted() {
        let verdict = verdict_for(&json!({}));
        assert_eq!(
            verdict.first_reason(),
            Some(&RejectReason::MissingFields {
                fields: vec![
                    "message".to_string(),
                    "status".to_string(),
                    "timestamp".to_string(),
                    "transactionId".to_string(),
                ]
            })
        );
    }

    #[test]
    fn test_minimal_success_rejected() {
        assert_eq!(code_for(&json!({"status": "success"})), "missing-fields");
    }

    #[test]
    fn test_missing_reported_before_extra() {
        let mut body = good_body();
        body.as_object_mut().unwrap().remove("timestamp");
        body["extra"] = json!("field");
        assert_eq!(
            verdict_for(&body).first_reason(),
            Some(&RejectReason::MissingFields {
                fields: vec!["timestamp".to_string()]
            })
        );
    }

    #[test]
    fn test_extra_field_rejected() {
        let mut body = good_body();
        body["extra"] = json!("field");
        body["another"] = json!(1);
        assert_eq!(
            verdict_for(&body).first_reason(),
            Some(&RejectReason::UnexpectedFields {
                fields: vec!["another".to_string(), "extra".to_string()]
            })
        );
    }

    #[test]
    fn test_wrong_types_checked_in_order() {
        let body = json!({"status": 200, "message": 123, "transactionId": 456, "timestamp": 789});
        assert_eq!(
            verdict_for(&body).first_reason(),
            Some(&RejectReason::WrongType { field: "status", found: "number" })
        );

        let mut body = good_body();
        body["timestamp"] = json!(null);
        assert_eq!(
            verdict_for(&body).first_reason(),
            Some(&RejectReason::WrongType { field: "timestamp", found: "null" })
        );

        let mut body = good_body();
        body["message"] = json!(["success"]);
        assert_eq!(
            verdict_for(&body).first_reason(),
            Some(&RejectReason::WrongType { field: "message", found: "array" })
        );
    }

    #[test]
    fn test_status_must_be_success() {
        let mut body = good_body();
        body["status"] = json!("ok");
        assert_eq!(code_for(&body), "bad-status");

        body["status"] = json!("SUCCESS");
        assert_eq!(code_for(&body), "bad-status");
    }

    #[test]
    fn test_message_rules() {
        let mut body = good_body();

        body["message"] = json!("");
        assert_eq!(
            verdict_for(&body).first_reason(),
            Some(&RejectReason::BadMessage(MessageProblem::Empty))
        );

        body["message"] = json!("    ");
        assert_eq!(
            verdict_for(&body).first_reason(),
            Some(&RejectReason::BadMessage(MessageProblem::Empty))
        );

        body["message"] = json!(" success ");
        assert_eq!(
            verdict_for(&body).first_reason(),
            Some(&RejectReason::BadMessage(MessageProblem::TooShort { len: 7, min: 10 }))
        );

        body["message"] = json!("short");
        assert!(matches!(
            verdict_for(&body).first_reason(),
            Some(RejectReason::BadMessage(MessageProblem::MissingKeyword { .. }))
        ));

        body["message"] = json!("Transaction completed");
        assert!(matches!(
            verdict_for(&body).first_reason(),
            Some(RejectReason::BadMessage(MessageProblem::MissingKeyword { .. }))
        ));

        body["message"] = json!("SUCCESSFULLY stored");
        assert!(verdict_for(&body).accepted);
    }

    #[test]
    fn test_id_rules() {
        let mut body = good_body();
        body["transactionId"] = json!("TXN-OTHER000");
        assert_eq!(code_for(&body), "id-mismatch");

        // echoed id matches but lacks the prefix
        let mut rec = record();
        rec.transaction_id = "ABC-1".to_string();
        body["transactionId"] = json!("ABC-1");
        let verdict = validate_response(
            &rec,
            200,
            &body.to_string(),
            now(),
            &ValidationPolicy::default(),
        );
        assert_eq!(verdict.codes(), vec!["bad-id-format"]);
    }

    #[test]
    fn test_timestamp_format() {
        let mut body = good_body();
        for bad in [
            "invalid-date",
            "2024-06-01",
            "2024-06-01T12:00:00",
            "2024-06-01T12:00",
            "",
            "1717243200",
            "12:00Z",
        ] {
            body["timestamp"] = json!(bad);
            assert_eq!(code_for(&body), "bad-timestamp-format", "timestamp {bad:?}");
        }
    }

    #[test]
    fn test_future_timestamp() {
        let mut body = good_body();
        body["timestamp"] = json!((now() + Duration::days(3650)).to_rfc3339());
        assert_eq!(code_for(&body), "future-timestamp");

        body["timestamp"] = json!((now() + Duration::milliseconds(1)).to_rfc3339());
        assert_eq!(code_for(&body), "future-timestamp");
    }

    #[test]
    fn test_age_boundary_is_inclusive() {
        let mut body = good_body();

        body["timestamp"] = json!((now() - Duration::seconds(300)).to_rfc3339());
        assert!(verdict_for(&body).accepted);

        body["timestamp"] = json!((now() - Duration::milliseconds(300_100)).to_rfc3339());
        assert_eq!(code_for(&body), "stale-timestamp");
    }

    #[test]
    fn test_policy_overrides() {
        let policy = ValidationPolicy::default().with_max_age_secs(10);
        let mut body = good_body();
        body["timestamp"] = json!((now() - Duration::seconds(11)).to_rfc3339());
        let verdict = validate_response(&record(), 200, &body.to_string(), now(), &policy);
        assert_eq!(verdict.codes(), vec!["stale-timestamp"]);

        let policy = ValidationPolicy {
            allowed_future_skew: Duration::seconds(5),
            ..ValidationPolicy::default()
        };
        body["timestamp"] = json!((now() + Duration::seconds(4)).to_rfc3339());
        let verdict = validate_response(&record(), 200, &body.to_string(), now(), &policy);
        assert!(verdict.accepted);
    }

    #[test]
    fn test_reason_display() {
        let reason = RejectReason::Status {
            status: 503,
            class: StatusClass::Unavailable,
        };
        assert_eq!(reason.to_string(), "status-error/unavailable: HTTP 503");

        let reason = RejectReason::MissingFields {
            fields: vec!["message".to_string(), "status".to_string()],
        };
        assert_eq!(reason.to_string(), "missing-fields: message, status");
    }
}
