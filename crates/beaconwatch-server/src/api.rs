//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `beacons` - Tracked beacon list and adding identifiers
//! - `monitoring` - Monitoring status and toggle
//! - `events` - Server-sent snapshot stream
//! - `health` - Service health checks
//! - `system` - System status
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod beacons;
pub mod error;
pub mod events;
pub mod health;
pub mod monitoring;
pub mod openapi;
pub mod system;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                  - Health check
/// /api
/// ├── /beacons             - List and add tracked beacons
/// │   └── /{identifier}    - Single tracked beacon
/// ├── /monitoring          - Monitoring status
/// │   └── /toggle          - Flip monitoring
/// ├── /events              - Server-sent beacon list updates
/// ├── /system/status       - System status
/// └── /openapi.json        - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .nest("/beacons", beacons::router())
                .nest("/monitoring", monitoring::router())
                .route("/events", get(events::stream_events))
                .nest("/system", system::router())
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::{spawn_state, SAMPLE};
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use beaconwatch_core::{
        parse_identifier, BeaconListView, PlatformEvent, ProximityCategory, RangedBeacon,
        RegionState,
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_routes_are_mounted() {
        let (state, _events) = spawn_state(Vec::new());
        let server = TestServer::new(create_router(state)).unwrap();

        server.get("/health").await.assert_status_ok();
        server.get("/api/beacons").await.assert_status_ok();
        server.get("/api/monitoring").await.assert_status_ok();
        server.get("/api/system/status").await.assert_status_ok();
        server.get("/api/openapi.json").await.assert_status_ok();
        server
            .get("/api/unknown")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_monitor_range_and_pause() {
        let identifier = parse_identifier(SAMPLE).unwrap();
        let (state, events) = spawn_state(Vec::new());
        let mut updates = state.coordinator.subscribe();
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .post("/api/beacons")
            .json(&json!({ "identifier": SAMPLE }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        server
            .post("/api/monitoring/toggle")
            .await
            .assert_status(StatusCode::ACCEPTED);
        tokio_test::assert_ok!(
            updates
                .wait_for(|s| s.is_monitoring && s.beacons.len() == 1)
                .await
        );

        events
            .send(PlatformEvent::StateDetermined {
                region: identifier,
                state: RegionState::Inside,
            })
            .unwrap();
        events
            .send(PlatformEvent::BeaconsRanged {
                region: identifier,
                beacons: vec![RangedBeacon {
                    identifier,
                    major: 1,
                    minor: 2,
                    proximity: ProximityCategory::Near,
                    accuracy_m: 1.5,
                    rssi: -60,
                }],
            })
            .unwrap();
        tokio_test::assert_ok!(updates.wait_for(|s| s.beacons[0].highlighted).await);

        let view: BeaconListView = server.get("/api/beacons").await.json();
        assert_eq!(view.toggle_label, "pause");
        let row = &view.beacons[0];
        assert_eq!(
            row.information,
            "Proximity: Near\nEstimated distance: 1.50 m\nRSSI: -60"
        );
        assert_eq!(row.state_information, "Inside region");
        assert!(row.highlighted);

        events
            .send(PlatformEvent::RegionExited { region: identifier })
            .unwrap();
        tokio_test::assert_ok!(
            updates
                .wait_for(|s| s.beacons[0].region_state == RegionState::Outside)
                .await
        );
        let view: BeaconListView = server.get("/api/beacons").await.json();
        assert_eq!(view.beacons[0].state_information, "Left region");
        assert!(!view.beacons[0].highlighted);

        server
            .post("/api/monitoring/toggle")
            .await
            .assert_status(StatusCode::ACCEPTED);
        tokio_test::assert_ok!(updates.wait_for(|s| !s.is_monitoring).await);
        let view: BeaconListView = server.get("/api/beacons").await.json();
        assert_eq!(view.toggle_label, "search");
        assert_eq!(view.beacons[0].information, "Beacon status");
        assert_eq!(view.beacons[0].state_information, "In region?");
    }

    #[tokio::test]
    async fn test_added_beacons_survive_restart() {
        use beaconwatch_core::{
            spawn_event_loop, BeaconCoordinator, JsonFileStore, RecordingLocationService,
            SAVED_BEACONS_KEY,
        };
        use tokio::sync::mpsc;

        use crate::state::AppState;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let start = |path: std::path::PathBuf| {
            let mut coordinator = BeaconCoordinator::new(
                RecordingLocationService::default(),
                JsonFileStore::new(path),
            );
            coordinator.setup().unwrap();
            let (_event_tx, event_rx) = mpsc::unbounded_channel();
            let (handle, task) = spawn_event_loop(coordinator, event_rx);
            (AppState::new(handle, None, true).shared(), task)
        };

        let (state, _task) = start(path.clone());
        let mut updates = state.coordinator.subscribe();
        let server = TestServer::new(create_router(state)).unwrap();
        server
            .post("/api/beacons")
            .json(&json!({ "identifier": SAMPLE }))
            .await
            .assert_status(StatusCode::ACCEPTED);
        // Commands run in order, so the add has been persisted once the toggle shows.
        server
            .post("/api/monitoring/toggle")
            .await
            .assert_status(StatusCode::ACCEPTED);
        tokio_test::assert_ok!(updates.wait_for(|s| s.is_monitoring).await);

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved[SAVED_BEACONS_KEY], json!([SAMPLE]));

        let (state, _task) = start(path);
        let server = TestServer::new(create_router(state)).unwrap();
        let view: BeaconListView = server.get("/api/beacons").await.json();
        assert_eq!(view.beacons.len(), 1);
        assert_eq!(view.beacons[0].identifier, SAMPLE);
    }
}
