//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
    /// Images waiting for a question, across all conversations
    pub pending_images: usize,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub uploads: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - can uploads be stored?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let uploads = check_uploads(&state).await;
    let all_ok = uploads.status == "ok";

    let (status, http_status) = if all_ok {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(ReadinessResponse {
            status,
            checks: ReadinessChecks { uploads },
            pending_images: state.relay.accumulator().total(),
        }),
    )
}

/// Check the upload directory is still present
async fn check_uploads(state: &ApiState) -> CheckResult {
    let dir = state.relay.uploads().dir();
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => CheckResult::ok(),
        Ok(_) => CheckResult::fail(format!("{} is not a directory", dir.display())),
        Err(e) => CheckResult::fail(format!("{}: {e}", dir.display())),
    }
}

/// Build health router (liveness only, no state needed)
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

/// Build readiness router
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state)
}
