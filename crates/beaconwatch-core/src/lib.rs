//! # beaconwatch-core
//!
//! Core logic for the beaconwatch iBeacon proximity monitor.
//!
//! This crate provides:
//! - A persisted list of tracked beacon identifiers
//! - The coordinator that monitors and ranges those beacons and mirrors each
//!   observation into a [`BeaconRecord`]
//! - A BlueZ-backed platform service that turns LE advertisements into region
//!   and ranging events
//! - The view model the presentation layer renders
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`beacon`] - Beacon records, identifiers, proximity and region state
//! - [`coordinator`] - The state machine that owns the tracked set
//! - [`runtime`] - Sequential event loop and the handle used to issue commands
//! - [`platform`] - The location service seam and its callback events
//! - [`region`] - Region entry/exit and ranging from raw sightings
//! - [`ibeacon`] - iBeacon advertisement decoding and distance estimation
//! - [`bluetooth`] - BlueZ adapter (feature `bluetooth`)
//! - [`storage`] - Identifier persistence
//! - [`config`] - Configuration loading, saving, and validation
//! - [`view`] - Rows and labels for display
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod beacon;
pub mod bluetooth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ibeacon;
pub mod platform;
pub mod region;
pub mod runtime;
pub mod storage;
pub mod view;

// Re-export primary types for convenience
pub use beacon::{
    identifier_label, parse_identifier, require_identifier, BeaconRecord, BeaconRegion,
    Observation, ProximityCategory, RangedBeacon, RegionState,
};
#[cfg(feature = "bluetooth")]
pub use bluetooth::BluezLocationService;
pub use bluetooth::{BluetoothError, BluetoothResult};
pub use config::{
    default_config_path, Config, ConfigError, ConfigResult, LoggingConfig, ScannerConfig,
    ServerConfig, StorageConfig,
};
pub use coordinator::{AddOutcome, BeaconCoordinator, TrackedSnapshot};
pub use error::{BeaconError, Result};
pub use ibeacon::{estimate_accuracy, IBeaconAdvertisement};
pub use platform::{LocationService, PlatformEvent, RecordingLocationService, ServiceRequest};
pub use region::{RegionTracker, Sighting};
pub use runtime::{run_event_loop, spawn_event_loop, CoordinatorHandle, UserCommand};
pub use storage::{
    default_data_dir, default_store_path, IdentifierStore, JsonFileStore, MemoryStore,
    StoreError, StoreResult, SAVED_BEACONS_KEY,
};
pub use view::{toggle_label, BeaconListView, BeaconRow};
