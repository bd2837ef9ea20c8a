//! # Transactions API Client
//!
//! Thin reqwest wrapper over the REST endpoints the till simulator uses.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST {base}/api/transactions/submit           timeout 10 s             │
//! │  GET  {base}/api/transactions/health           timeout  5 s             │
//! │  GET  {base}/api/transactions/stats/{storeId}  timeout  5 s             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every status code comes back as a [`RawResponse`]. Only failures to get
//! a response at all (connect, timeout, protocol) are [`LinkError`]s.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use till_core::TransactionRecord;

use crate::error::{LinkError, LinkResult};

pub const SUBMIT_PATH: &str = "/api/transactions/submit";
pub const HEALTH_PATH: &str = "/api/transactions/health";
pub const STATS_PATH: &str = "/api/transactions/stats";

pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Raw Response
// =============================================================================

/// Everything the transport observed about one response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    /// Wall time from send to full body.
    pub elapsed: Duration,
}

impl RawResponse {
    /// Header value as text, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    /// Body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

// =============================================================================
// API Client
// =============================================================================

/// Client for the transactions API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    submit_timeout: Duration,
    status_timeout: Duration,
}

impl ApiClient {
    /// Creates a client for `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> LinkResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("till-simulator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ApiClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            submit_timeout: SUBMIT_TIMEOUT,
            status_timeout: STATUS_TIMEOUT,
        })
    }

    /// Overrides both timeouts.
    pub fn with_timeouts(mut self, submit: Duration, status: Duration) -> Self {
        self.submit_timeout = submit;
        self.status_timeout = status;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts a transaction record.
    pub async fn submit(&self, record: &TransactionRecord) -> LinkResult<RawResponse> {
        self.submit_json(record).await
    }

    /// Posts any serializable body to the submit endpoint.
    pub async fn submit_json<T: Serialize + ?Sized>(&self, body: &T) -> LinkResult<RawResponse> {
        let payload = serde_json::to_vec(body)?;
        self.post_bytes(payload).await
    }

    /// Posts a raw body labelled as JSON, whether or not it is.
    pub async fn submit_raw(&self, body: &str) -> LinkResult<RawResponse> {
        self.post_bytes(body.as_bytes().to_vec()).await
    }

    pub async fn health(&self) -> LinkResult<RawResponse> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        self.execute(self.client.get(url), self.status_timeout).await
    }

    pub async fn stats(&self, store_id: &str) -> LinkResult<RawResponse> {
        let url = format!("{}{}/{}", self.base_url, STATS_PATH, store_id);
        self.execute(self.client.get(url), self.status_timeout).await
    }

    async fn post_bytes(&self, payload: Vec<u8>) -> LinkResult<RawResponse> {
        let url = format!("{}{}", self.base_url, SUBMIT_PATH);
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        self.execute(request, self.submit_timeout).await
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> LinkResult<RawResponse> {
        let started = Instant::now();

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_send_error(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| map_send_error(e, timeout))?;
        let elapsed = started.elapsed();

        debug!(
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            bytes = body.len(),
            "API response received"
        );

        Ok(RawResponse {
            status,
            headers,
            body,
            elapsed,
        })
    }
}

fn map_send_error(err: reqwest::Error, timeout: Duration) -> LinkError {
    if err.is_timeout() {
        LinkError::Timeout(timeout.as_millis() as u64)
    } else {
        err.into()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use till_core::TransactionGenerator;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn echo_submit(body: String) -> (StatusCode, Json<Value>) {
        match serde_json::from_str::<Value>(&body) {
            Ok(record) => (
                StatusCode::OK,
                Json(json!({
                    "status": "success",
                    "message": "Transaction processed successfully",
                    "transactionId": record["transactionId"],
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })),
            ),
            Err(_) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "error", "message": "Malformed JSON"})),
            ),
        }
    }

    fn app() -> Router {
        Router::new()
            .route(SUBMIT_PATH, post(echo_submit))
            .route(HEALTH_PATH, get(|| async { Json(json!({"status": "UP"})) }))
            .route(
                "/api/transactions/stats/{store_id}",
                get(|Path(store_id): Path<String>| async move {
                    Json(json!({
                        "storeId": store_id,
                        "totalTransactions": 3,
                        "totalAmount": 12.5,
                        "averageAmount": 4.17,
                    }))
                }),
            )
    }

    #[tokio::test]
    async fn test_submit_round_trip() {
        let client = ApiClient::new(spawn(app()).await).unwrap();
        let record = TransactionGenerator::seeded(1).generate();

        let response = client.submit(&record).await.unwrap();
        assert!(response.is_success());
        assert!(response.content_type().unwrap().contains("application/json"));

        let body = response.json().unwrap();
        assert_eq!(body["transactionId"], record.transaction_id.as_str());
    }

    #[tokio::test]
    async fn test_non_json_submit_gets_400_not_error() {
        let client = ApiClient::new(spawn(app()).await).unwrap();
        let response = client.submit_raw("invalid json").await.unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(response.json().unwrap()["status"], "error");
    }

    #[tokio::test]
    async fn test_health_and_stats() {
        let client = ApiClient::new(spawn(app()).await).unwrap();

        let health = client.health().await.unwrap();
        assert_eq!(health.json().unwrap()["status"], "UP");

        let stats = client.stats("STORE-003").await.unwrap();
        assert_eq!(stats.json().unwrap()["storeId"], "STORE-003");
    }

    #[tokio::test]
    async fn test_error_statuses_are_returned() {
        let app = Router::new().route(
            SUBMIT_PATH,
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
        );
        let client = ApiClient::new(spawn(app).await).unwrap();
        let record = TransactionGenerator::seeded(2).generate();

        let response = client.submit(&record).await.unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(response.body, "down for maintenance");
        assert!(response.json().is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_link_error() {
        let app = Router::new().route(
            HEALTH_PATH,
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );
        let client = ApiClient::new(spawn(app).await)
            .unwrap()
            .with_timeouts(Duration::from_millis(100), Duration::from_millis(100));

        let err = client.health().await.unwrap_err();
        assert!(matches!(err, LinkError::Timeout(100)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{addr}")).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, LinkError::ConnectionFailed(_)), "got {err:?}");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
