//! OpenAPI specification generation for the beaconwatch API.
//!
//! The document is served at `/api/openapi.json` and written to the
//! workspace root by the `gen-openapi` binary for client generation.

use axum::Json;
use beaconwatch_core::{BeaconListView, BeaconRow, RegionState};
use utoipa::OpenApi;

use super::beacons::{AddBeaconRequest, AddBeaconResponse};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::monitoring::{MonitoringResponse, ToggleMonitoringResponse};
use super::system::SystemStatusResponse;

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for beaconwatch.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "beaconwatch API",
        version = "0.1.0",
        description = r#"
# beaconwatch API

beaconwatch watches a user-chosen list of iBeacon identifiers and reports how
close each one is.

## Overview

1. **Tracked beacons**: Add identifiers; the list is persisted across restarts
2. **Monitoring**: Toggle region monitoring for every tracked beacon at once
3. **Live updates**: Subscribe to `/api/events` for a fresh list after every change

Rows show the proximity bucket, estimated distance and signal strength of the
latest ranging result, and whether the device is inside the beacon's region.
Commands are queued; their effect shows up in the next published list.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local beaconwatch server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks and system status"
        ),
        (
            name = "beacons",
            description = "Tracked beacon list and live updates"
        ),
        (
            name = "monitoring",
            description = "Region monitoring on/off"
        )
    ),
    paths(
        super::health::health_check,
        super::system::get_status,
        super::beacons::list_beacons,
        super::beacons::add_beacon,
        super::beacons::get_beacon,
        super::monitoring::get_monitoring,
        super::monitoring::toggle_monitoring,
        super::events::stream_events,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            SystemStatusResponse,
            AddBeaconRequest,
            AddBeaconResponse,
            BeaconListView,
            BeaconRow,
            RegionState,
            MonitoringResponse,
            ToggleMonitoringResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "beaconwatch API");
        assert!(spec.paths.paths.contains_key("/api/beacons"));
        assert!(spec.paths.paths.contains_key("/api/beacons/{identifier}"));
        assert!(spec.paths.paths.contains_key("/api/monitoring/toggle"));
        assert!(spec.paths.paths.contains_key("/api/events"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"beaconwatch API\""));
    }
}
