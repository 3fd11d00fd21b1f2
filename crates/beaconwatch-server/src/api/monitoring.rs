//! Monitoring API endpoints.
//!
//! Reports whether the tracked regions are being monitored and flips it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use beaconwatch_core::toggle_label;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the monitoring router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_monitoring))
        .route("/toggle", post(toggle_monitoring))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Monitoring status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "monitoring": true,
    "toggle_label": "pause",
    "ranging_available": true,
    "bluetooth_available": true
}))]
pub struct MonitoringResponse {
    /// Whether monitoring is active.
    #[schema(example = true)]
    pub monitoring: bool,

    /// Label of the toggle, `search` while off and `pause` while on.
    #[schema(example = "pause")]
    pub toggle_label: String,

    /// Whether the location service can range.
    #[schema(example = true)]
    pub ranging_available: bool,

    /// Whether a Bluetooth adapter backs the location service.
    #[schema(example = true)]
    pub bluetooth_available: bool,
}

/// Toggle acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "accepted": true
}))]
pub struct ToggleMonitoringResponse {
    /// The toggle was queued. The new flag shows up in the next snapshot.
    #[schema(example = true)]
    pub accepted: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get monitoring status.
#[utoipa::path(
    get,
    path = "/api/monitoring",
    tag = "monitoring",
    operation_id = "getMonitoring",
    summary = "Get monitoring status",
    responses(
        (status = 200, description = "Monitoring status", body = MonitoringResponse)
    )
)]
pub async fn get_monitoring(State(state): State<SharedState>) -> Json<MonitoringResponse> {
    let monitoring = state.coordinator.snapshot().is_monitoring;

    Json(MonitoringResponse {
        monitoring,
        toggle_label: toggle_label(monitoring).to_string(),
        ranging_available: state.ranging_available,
        bluetooth_available: state.bluetooth_available(),
    })
}

/// Flip monitoring on or off.
#[utoipa::path(
    post,
    path = "/api/monitoring/toggle",
    tag = "monitoring",
    operation_id = "toggleMonitoring",
    summary = "Toggle monitoring",
    description = "Starts monitoring every tracked beacon when off. When on, stops \
        monitoring and ranging for every tracked beacon and clears their rows.",
    responses(
        (status = 202, description = "Toggle queued", body = ToggleMonitoringResponse),
        (status = 503, description = "Coordinator is not running", body = ErrorResponse)
    )
)]
pub async fn toggle_monitoring(
    State(state): State<SharedState>,
) -> ApiResult<(StatusCode, Json<ToggleMonitoringResponse>)> {
    state.coordinator.toggle_monitoring().await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ToggleMonitoringResponse { accepted: true }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{spawn_state, stopped_state};
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_toggle_flips_monitoring() {
        let (state, _events) = spawn_state(Vec::new());
        let mut updates = state.coordinator.subscribe();
        let server = TestServer::new(router().with_state(state)).unwrap();

        let status: MonitoringResponse = server.get("/").await.json();
        assert!(!status.monitoring);
        assert_eq!(status.toggle_label, "search");

        server.post("/toggle").await.assert_status(StatusCode::ACCEPTED);
        tokio_test::assert_ok!(updates.wait_for(|s| s.is_monitoring).await);

        let status: MonitoringResponse = server.get("/").await.json();
        assert!(status.monitoring);
        assert_eq!(status.toggle_label, "pause");
        assert!(status.ranging_available);
        assert!(!status.bluetooth_available);
    }

    #[tokio::test]
    async fn test_toggle_fails_when_coordinator_stopped() {
        let server = TestServer::new(router().with_state(stopped_state())).unwrap();

        server
            .post("/toggle")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }
}
