//! # beaconwatch-server
//!
//! HTTP server for the beaconwatch iBeacon proximity monitor.
//!
//! This binary provides:
//! - REST API for the tracked beacon list and the monitoring toggle
//! - Server-sent events with the rendered list after every change
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package beaconwatch-server
//!
//! # Custom configuration file
//! BEACONWATCH_CONFIG=./beaconwatch.toml ./beaconwatch-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;

use beaconwatch_core::{
    default_config_path, spawn_event_loop, BeaconCoordinator, Config, IdentifierStore,
    JsonFileStore, LocationService, PlatformEvent, RecordingLocationService,
};
use beaconwatch_server::api;
use beaconwatch_server::logging;
use beaconwatch_server::state::AppState;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Environment variable pointing at the configuration file.
const CONFIG_PATH_ENV: &str = "BEACONWATCH_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| default_config_path(), PathBuf::from);
    let config = Config::load_or_default(&config_path)?;

    logging::init(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting beaconwatch-server"
    );

    let store = JsonFileStore::new(config.store_path()?);
    info!(path = %store.path().display(), "Using beacon store");

    let state = start_coordinator(&config, store).await;
    let app = api::create_router(state.shared());

    let addr = config.bind_address()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("beaconwatch-server stopped");
    Ok(())
}

/// Open the location service and spawn the coordinator event loop.
///
/// Bluetooth failures are not fatal: the server keeps serving the tracked
/// list, it just never observes anything.
async fn start_coordinator(config: &Config, store: JsonFileStore) -> AppState {
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    #[cfg(feature = "bluetooth")]
    match beaconwatch_core::BluezLocationService::start(&config.scanner, event_tx).await {
        Ok((service, _scanner)) => {
            let adapter = service.adapter_name().to_string();
            return launch(service, store, event_rx, Some(adapter));
        }
        Err(e) => warn!(error = %e, "Bluetooth unavailable; beacons will not be observed"),
    }

    #[cfg(not(feature = "bluetooth"))]
    {
        drop(event_tx);
        warn!(
            ranging = config.scanner.ranging_available,
            "Built without Bluetooth support; beacons will not be observed"
        );
    }

    launch(RecordingLocationService::new(false), store, event_rx, None)
}

fn launch<S, P>(
    service: S,
    store: P,
    events: mpsc::UnboundedReceiver<PlatformEvent>,
    bluetooth_adapter: Option<String>,
) -> AppState
where
    S: LocationService + Send + 'static,
    P: IdentifierStore + Send + 'static,
{
    let ranging_available = service.is_ranging_available();
    let mut coordinator = BeaconCoordinator::new(service, store);

    match coordinator.setup() {
        Ok(loaded) => info!(loaded, "Loaded tracked beacons"),
        Err(e) => error!(error = %e, "Failed to load tracked beacons; starting empty"),
    }

    let (handle, _event_loop) = spawn_event_loop(coordinator, events);
    AppState::new(handle, bluetooth_adapter, ranging_available)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
