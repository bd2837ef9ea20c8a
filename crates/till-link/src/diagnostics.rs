//! # Response Diagnostics
//!
//! Advisory checks on a raw HTTP response. None of these change the
//! validator's verdict; they surface signs of a misbehaving API (caching
//! proxies, error pages, sluggish handlers) in the logs.
//!
//! ```text
//!   latency     > 5 s  warn      > 2 s  info
//!   headers     cache-control / etag / last-modified present  warn
//!   200 only    content type not application/json            warn
//!               charset other than utf-8                     warn
//!   body size   < 50 bytes or > 10 000 bytes                 warn
//! ```

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::http::RawResponse;

pub const SLOW_WARN: Duration = Duration::from_secs(5);
pub const SLOW_INFO: Duration = Duration::from_secs(2);
pub const MIN_BODY_BYTES: usize = 50;
pub const MAX_BODY_BYTES: usize = 10_000;

const CACHE_HEADERS: [&str; 3] = ["cache-control", "etag", "last-modified"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
}

/// One advisory finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    SlowResponse { elapsed: Duration, severity: Severity },
    CacheHeaders { headers: Vec<&'static str> },
    UnexpectedContentType { content_type: String },
    UnexpectedCharset { charset: String },
    BodyTooSmall { bytes: usize },
    BodyTooLarge { bytes: usize },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::SlowResponse { severity, .. } => *severity,
            _ => Severity::Warn,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SlowResponse { elapsed, .. } => {
                write!(f, "response took {:.2}s", elapsed.as_secs_f64())
            }
            Diagnostic::CacheHeaders { headers } => {
                write!(f, "cache headers present ({}); response may be cached", headers.join(", "))
            }
            Diagnostic::UnexpectedContentType { content_type } => {
                write!(f, "expected application/json, got {content_type:?}")
            }
            Diagnostic::UnexpectedCharset { charset } => write!(f, "unexpected charset {charset}"),
            Diagnostic::BodyTooSmall { bytes } => write!(f, "response body only {bytes} bytes"),
            Diagnostic::BodyTooLarge { bytes } => write!(f, "response body is {bytes} bytes"),
        }
    }
}

/// Runs every check against a response.
pub fn inspect(response: &RawResponse) -> Vec<Diagnostic> {
    let mut findings = Vec::new();

    if response.elapsed > SLOW_WARN {
        findings.push(Diagnostic::SlowResponse {
            elapsed: response.elapsed,
            severity: Severity::Warn,
        });
    } else if response.elapsed > SLOW_INFO {
        findings.push(Diagnostic::SlowResponse {
            elapsed: response.elapsed,
            severity: Severity::Info,
        });
    }

    let cached: Vec<&'static str> = CACHE_HEADERS
        .into_iter()
        .filter(|name| response.headers.contains_key(*name))
        .collect();
    if !cached.is_empty() {
        findings.push(Diagnostic::CacheHeaders { headers: cached });
    }

    if response.is_success() {
        let content_type = response.content_type().unwrap_or("");
        if !content_type.to_lowercase().contains("application/json") {
            findings.push(Diagnostic::UnexpectedContentType {
                content_type: content_type.to_string(),
            });
        }
        if let Some(charset) = charset_of(content_type) {
            let lowered = charset.to_lowercase();
            if lowered != "utf-8" && lowered != "utf8" {
                findings.push(Diagnostic::UnexpectedCharset {
                    charset: charset.to_string(),
                });
            }
        }

        let bytes = response.body.len();
        if bytes < MIN_BODY_BYTES {
            findings.push(Diagnostic::BodyTooSmall { bytes });
        } else if bytes > MAX_BODY_BYTES {
            findings.push(Diagnostic::BodyTooLarge { bytes });
        }
    }

    findings
}

/// Logs each finding against the transaction it concerns.
pub fn report(transaction_id: &str, findings: &[Diagnostic]) {
    for finding in findings {
        match finding.severity() {
            Severity::Info => info!(transaction_id, "{}", finding),
            Severity::Warn => warn!(transaction_id, "{}", finding),
        }
    }
}

fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, ETAG};

    const GOOD_BODY: &str = r#"{"status":"success","message":"Transaction processed successfully","transactionId":"TXN-1","timestamp":"2024-01-01T00:00:00Z"}"#;

    fn response(content_type: &str, body: &str, elapsed_ms: u64) -> RawResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        RawResponse {
            status: 200,
            headers,
            body: body.to_string(),
            elapsed: Duration::from_millis(elapsed_ms),
        }
    }

    #[test]
    fn test_clean_response_has_no_findings() {
        let r = response("application/json; charset=UTF-8", GOOD_BODY, 40);
        assert!(inspect(&r).is_empty());
    }

    #[test]
    fn test_latency_thresholds() {
        let r = response("application/json", GOOD_BODY, 2_500);
        assert_eq!(
            inspect(&r),
            vec![Diagnostic::SlowResponse {
                elapsed: Duration::from_millis(2_500),
                severity: Severity::Info
            }]
        );

        let r = response("application/json", GOOD_BODY, 5_001);
        assert_eq!(inspect(&r)[0].severity(), Severity::Warn);
    }

    #[test]
    fn test_cache_headers() {
        let mut r = response("application/json", GOOD_BODY, 10);
        r.headers.insert(ETAG, HeaderValue::from_static("\"abc\""));
        assert_eq!(
            inspect(&r),
            vec![Diagnostic::CacheHeaders { headers: vec!["etag"] }]
        );
    }

    #[test]
    fn test_content_type_and_charset() {
        let r = response("text/html; charset=ISO-8859-1", GOOD_BODY, 10);
        let findings = inspect(&r);
        assert!(matches!(findings[0], Diagnostic::UnexpectedContentType { .. }));
        assert_eq!(
            findings[1],
            Diagnostic::UnexpectedCharset {
                charset: "ISO-8859-1".to_string()
            }
        );
    }

    #[test]
    fn test_body_size() {
        let r = response("application/json", "{}", 10);
        assert_eq!(inspect(&r), vec![Diagnostic::BodyTooSmall { bytes: 2 }]);

        let big = format!("\"{}\"", "x".repeat(MAX_BODY_BYTES));
        let r = response("application/json", &big, 10);
        assert!(matches!(inspect(&r)[0], Diagnostic::BodyTooLarge { .. }));
    }

    #[test]
    fn test_error_status_skips_body_checks() {
        let mut r = response("text/plain", "oops", 10);
        r.status = 500;
        assert!(inspect(&r).is_empty());
    }
}
