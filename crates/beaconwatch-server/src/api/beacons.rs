//! Tracked beacon API endpoints.
//!
//! Lists the tracked set as rendered rows and accepts new identifiers.
//! Adding is fire-and-forget: the response only says whether the text was
//! well formed and queued, the row itself shows up in the next snapshot.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use beaconwatch_core::{identifier_label, require_identifier, BeaconListView, BeaconRow};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the beacons router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_beacons).post(add_beacon))
        .route("/{identifier}", get(get_beacon))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to start tracking a beacon.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "identifier": "E2C56DB5-DFFB-48D2-B060-D0F5A71096E0"
}))]
pub struct AddBeaconRequest {
    /// Beacon identifier as typed by the user, hyphenated form.
    #[schema(example = "E2C56DB5-DFFB-48D2-B060-D0F5A71096E0")]
    pub identifier: String,
}

/// Result of submitting an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "accepted": true
}))]
pub struct AddBeaconResponse {
    /// `true` if the identifier was well formed and queued. Duplicates are
    /// accepted and ignored by the coordinator.
    #[schema(example = true)]
    pub accepted: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// List tracked beacons.
#[utoipa::path(
    get,
    path = "/api/beacons",
    tag = "beacons",
    operation_id = "listBeacons",
    summary = "List tracked beacons",
    description = "Returns one rendered row per tracked beacon in the order they were \
        added, together with the monitoring flag and the toggle label.",
    responses(
        (status = 200, description = "Current beacon list", body = BeaconListView)
    )
)]
pub async fn list_beacons(State(state): State<SharedState>) -> Json<BeaconListView> {
    Json(BeaconListView::render(&state.coordinator.snapshot()))
}

/// Start tracking a beacon.
#[utoipa::path(
    post,
    path = "/api/beacons",
    tag = "beacons",
    operation_id = "addBeacon",
    summary = "Track a beacon",
    description = "Queues an identifier for tracking. Malformed text is ignored and \
        reported with `accepted: false`. The new row appears in the next snapshot.",
    request_body = AddBeaconRequest,
    responses(
        (status = 202, description = "Submission processed", body = AddBeaconResponse),
        (status = 503, description = "Coordinator is not running", body = ErrorResponse)
    )
)]
pub async fn add_beacon(
    State(state): State<SharedState>,
    Json(request): Json<AddBeaconRequest>,
) -> ApiResult<(StatusCode, Json<AddBeaconResponse>)> {
    let accepted = state
        .coordinator
        .submit_identifier(&request.identifier)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(AddBeaconResponse { accepted })))
}

/// Get one tracked beacon.
#[utoipa::path(
    get,
    path = "/api/beacons/{identifier}",
    tag = "beacons",
    operation_id = "getBeacon",
    summary = "Get a tracked beacon",
    params(
        ("identifier" = String, Path, description = "Beacon identifier, hyphenated form")
    ),
    responses(
        (status = 200, description = "Beacon row", body = BeaconRow),
        (status = 400, description = "Malformed identifier", body = ErrorResponse),
        (status = 404, description = "Beacon is not tracked", body = ErrorResponse)
    )
)]
pub async fn get_beacon(
    State(state): State<SharedState>,
    Path(identifier): Path<String>,
) -> ApiResult<Json<BeaconRow>> {
    let identifier = require_identifier(&identifier)?;

    state
        .coordinator
        .snapshot()
        .beacons
        .iter()
        .find(|record| record.identifier == identifier)
        .map(|record| Json(BeaconRow::from_record(record)))
        .ok_or_else(|| ApiError::NotFound {
            error_code: "beacon_not_found".to_string(),
            message: format!("Beacon {} is not tracked", identifier_label(&identifier)),
        })
}
