//! Liveness and readiness endpoints (no authentication)

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use contract_common::db::ping;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Probe response body
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// GET /health/live
///
/// Reports the process is running; never touches the database.
pub async fn live() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "ok",
        reason: None,
    })
}

/// GET /health/ready
///
/// Pings the database, bounded by the readiness timeout.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    let reachable = match tokio::time::timeout(state.readiness_timeout, ping(&state.db)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Readiness ping failed");
            false
        }
        Err(_) => {
            warn!(
                timeout_ms = state.readiness_timeout.as_millis() as u64,
                "Readiness ping timed out"
            );
            false
        }
    };

    if reachable {
        (
            StatusCode::OK,
            Json(ProbeResponse {
                status: "ready",
                reason: None,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ProbeResponse {
                status: "unavailable",
                reason: Some("database unreachable"),
            }),
        )
    }
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
}
