use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the snapshot store is reachable.
    pub store_healthy: bool,
    /// Snapshot-created notifications that could not be delivered since start.
    pub notification_failures: u64,
    /// Live receivers on the event bus.
    pub event_subscribers: usize,
}

/// GET /health -- returns service and snapshot store health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_healthy = match state.engine.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Snapshot store health check failed");
            false
        }
    };

    let status = if store_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store_healthy,
        notification_failures: state.engine.notification_failures(),
        event_subscribers: state.event_bus.subscriber_count(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
