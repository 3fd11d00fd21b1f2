//! System API endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Creates the system router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new().route("/status", get(get_status))
}

/// System status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "version": "0.1.0",
    "uptime_secs": 3600,
    "bluetooth_available": true,
    "bluetooth_adapter": "hci0",
    "ranging_available": true,
    "event_loop_running": true,
    "tracked_beacons": 2,
    "revision": 14
}))]
pub struct SystemStatusResponse {
    /// Server version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Server uptime in seconds.
    #[schema(example = 3600)]
    pub uptime_secs: u64,

    /// Whether a Bluetooth adapter backs the location service.
    #[schema(example = true)]
    pub bluetooth_available: bool,

    /// Name of the Bluetooth adapter in use.
    #[schema(example = "hci0")]
    pub bluetooth_adapter: Option<String>,

    /// Whether the location service can range.
    #[schema(example = true)]
    pub ranging_available: bool,

    /// Whether the coordinator event loop is accepting commands.
    #[schema(example = true)]
    pub event_loop_running: bool,

    /// Number of tracked beacons.
    #[schema(example = 2)]
    pub tracked_beacons: usize,

    /// Revision of the latest published snapshot.
    #[schema(example = 14)]
    pub revision: u64,
}

/// Get system status.
#[utoipa::path(
    get,
    path = "/api/system/status",
    tag = "system",
    operation_id = "getSystemStatus",
    summary = "Get system status",
    description = "Returns the current system status including version, uptime, \
        and component availability.",
    responses(
        (status = 200, description = "System status retrieved", body = SystemStatusResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<SystemStatusResponse> {
    let snapshot = state.coordinator.snapshot();

    Json(SystemStatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        bluetooth_available: state.bluetooth_available(),
        bluetooth_adapter: state.bluetooth_adapter.clone(),
        ranging_available: state.ranging_available,
        event_loop_running: state.coordinator.is_running(),
        tracked_beacons: snapshot.beacons.len(),
        revision: snapshot.revision,
    })
}
