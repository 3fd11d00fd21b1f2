//! Health check API endpoint.
//!
//! Provides a simple health check endpoint for monitoring and load balancers.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "monitoring": false
}))]
pub struct HealthResponse {
    /// Service status. `degraded` once the event loop has stopped.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version from Cargo.toml.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Whether beacon monitoring is active.
    #[schema(example = false)]
    pub monitoring: bool,
}

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check service health",
    description = "Returns basic service status information. Use this endpoint \
        for load balancer health checks and monitoring.",
    responses(
        (status = 200, description = "Service is reachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    let status = if state.coordinator.is_running() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        monitoring: state.coordinator.snapshot().is_monitoring,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{spawn_state, stopped_state};
    use axum_test::TestServer;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            monitoring: false,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"monitoring\":false"));
    }

    #[tokio::test]
    async fn test_health_reports_ok_while_running() {
        let (state, _events) = spawn_state(Vec::new());
        let server = TestServer::new(router().with_state(state)).unwrap();

        let health: HealthResponse = server.get("/").await.json();
        assert_eq!(health.status, "ok");
        assert!(!health.monitoring);
    }

    #[tokio::test]
    async fn test_health_reports_degraded_when_stopped() {
        let server = TestServer::new(router().with_state(stopped_state())).unwrap();

        let health: HealthResponse = server.get("/").await.json();
        assert_eq!(health.status, "degraded");
    }
}
