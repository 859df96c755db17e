//! Admin endpoint handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use crossbar_core::AuthRecord;
use serde_json::json;

use super::AdminState;
use crate::network::HealthState;
use crate::routing::RegionSnapshot;

/// Detailed health JSON. Always 200: the `state` field distinguishes a
/// draining server from a dead one.
pub async fn health_handler(State(state): State<AdminState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": state.shutdown.health_state().as_str(),
        "connections": state.registry.count(),
        "in_flight": state.shutdown.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness probe: the process is up and responsive.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: 200 only while the server accepts traffic.
pub async fn readiness_handler(State(state): State<AdminState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Per-region circuit state and health gauge.
pub async fn regions_handler(State(state): State<AdminState>) -> Json<Vec<RegionSnapshot>> {
    Json(state.health.snapshot())
}

/// Out-of-band audit lookup by stan. Absent records are 404, not errors.
pub async fn transaction_handler(
    State(state): State<AdminState>,
    Path(stan): Path<String>,
) -> Result<Json<AuthRecord>, StatusCode> {
    match state.store.get_transaction(&stan).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::warn!(stan = %stan, error = %e, "transaction lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
