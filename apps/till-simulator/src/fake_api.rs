//! In-process transactions API for probe and runner tests.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use till_link::http::{HEALTH_PATH, SUBMIT_PATH};

const REQUIRED: [&str; 9] = [
    "transactionId",
    "customerId",
    "storeId",
    "tillId",
    "paymentMethod",
    "totalAmount",
    "currency",
    "timestamp",
    "items",
];

/// Binds to an ephemeral port and serves `app`; returns the base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Address nothing listens on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn submit(body: String) -> (StatusCode, Json<Value>) {
    let Ok(record) = serde_json::from_str::<Value>(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": "Malformed JSON request"})),
        );
    };

    let missing: Vec<&str> = REQUIRED
        .into_iter()
        .filter(|field| record.get(*field).is_none())
        .collect();
    if !missing.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": "error",
                "message": "Validation failed",
                "error": format!("missing: {}", missing.join(", ")),
            })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Transaction processed successfully",
            "transactionId": record["transactionId"],
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

async fn stats(Path(store_id): Path<String>) -> Json<Value> {
    Json(json!({
        "storeId": store_id,
        "totalTransactions": 12,
        "totalAmount": 145.3,
        "averageAmount": 12.11,
    }))
}

/// Health and submit, no stats endpoint.
pub fn without_stats() -> Router {
    Router::new()
        .route(SUBMIT_PATH, post(submit))
        .route(HEALTH_PATH, get(|| async { Json(json!({"status": "UP"})) }))
}

/// A well-behaved API.
pub fn healthy() -> Router {
    without_stats().route("/api/transactions/stats/{store_id}", get(stats))
}
