//! The seam between the coordinator and the platform location service.
//!
//! Requests go out through [`LocationService`] and never block: their outcome
//! arrives later as a [`PlatformEvent`]. Events are delivered on a channel and
//! handled one at a time by the event loop.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::beacon::{BeaconRegion, RangedBeacon, RegionState};

/// Requests the coordinator can issue to the platform service.
pub trait LocationService {
    /// Begin monitoring entry and exit for a region.
    fn start_monitoring(&mut self, region: &BeaconRegion);

    /// Stop monitoring a region.
    fn stop_monitoring(&mut self, region: &BeaconRegion);

    /// Begin delivering ranged readings for a region.
    fn start_ranging(&mut self, region: &BeaconRegion);

    /// Stop delivering ranged readings for a region.
    fn stop_ranging(&mut self, region: &BeaconRegion);

    /// Ask for the current state of a region. Answered by
    /// [`PlatformEvent::StateDetermined`].
    fn request_state(&mut self, region: &BeaconRegion);

    /// Whether this device can range beacons.
    fn is_ranging_available(&self) -> bool;

    /// Whether this device can monitor beacon regions.
    fn is_monitoring_available(&self) -> bool {
        true
    }
}

/// Callbacks delivered by the platform service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Monitoring began for a region.
    MonitoringStarted {
        /// The region.
        region: Uuid,
    },
    /// The state of a region was determined.
    StateDetermined {
        /// The region.
        region: Uuid,
        /// Its current state.
        state: RegionState,
    },
    /// The device entered a region.
    RegionEntered {
        /// The region.
        region: Uuid,
    },
    /// The device left a region.
    RegionExited {
        /// The region.
        region: Uuid,
    },
    /// A ranging pass completed. `beacons` may be empty.
    BeaconsRanged {
        /// The ranged region.
        region: Uuid,
        /// Readings for beacons in the region.
        beacons: Vec<RangedBeacon>,
    },
    /// Monitoring failed, optionally for a specific region.
    MonitoringFailed {
        /// The region, when the platform knows it.
        region: Option<Uuid>,
        /// Platform error description.
        message: String,
    },
    /// Ranging failed for a region.
    RangingFailed {
        /// The region.
        region: Uuid,
        /// Platform error description.
        message: String,
    },
    /// The service itself reported an error.
    ServiceFailed {
        /// Platform error description.
        message: String,
    },
}

/// A request recorded by [`RecordingLocationService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "request", content = "region", rename_all = "snake_case")]
pub enum ServiceRequest {
    /// `start_monitoring`
    StartMonitoring(Uuid),
    /// `stop_monitoring`
    StopMonitoring(Uuid),
    /// `start_ranging`
    StartRanging(Uuid),
    /// `stop_ranging`
    StopRanging(Uuid),
    /// `request_state`
    RequestState(Uuid),
}

/// A [`LocationService`] that only records what it was asked to do.
///
/// Used in tests, and by builds without the `bluetooth` feature.
#[derive(Debug, Clone)]
pub struct RecordingLocationService {
    requests: Vec<ServiceRequest>,
    ranging_available: bool,
}

impl Default for RecordingLocationService {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RecordingLocationService {
    /// Create a recorder with the given ranging capability.
    #[must_use]
    pub const fn new(ranging_available: bool) -> Self {
        Self {
            requests: Vec::new(),
            ranging_available,
        }
    }

    /// Every request issued so far, in order.
    #[must_use]
    pub fn requests(&self) -> &[ServiceRequest] {
        &self.requests
    }

    /// Count requests matching a predicate.
    pub fn count(&self, predicate: impl Fn(&ServiceRequest) -> bool) -> usize {
        self.requests.iter().filter(|r| predicate(r)).count()
    }
}

impl LocationService for RecordingLocationService {
    fn start_monitoring(&mut self, region: &BeaconRegion) {
        self.requests
            .push(ServiceRequest::StartMonitoring(region.identifier));
    }

    fn stop_monitoring(&mut self, region: &BeaconRegion) {
        self.requests
            .push(ServiceRequest::StopMonitoring(region.identifier));
    }

    fn start_ranging(&mut self, region: &BeaconRegion) {
        self.requests.push(ServiceRequest::StartRanging(region.identifier));
    }

    fn stop_ranging(&mut self, region: &BeaconRegion) {
        self.requests.push(ServiceRequest::StopRanging(region.identifier));
    }

    fn request_state(&mut self, region: &BeaconRegion) {
        self.requests.push(ServiceRequest::RequestState(region.identifier));
    }

    fn is_ranging_available(&self) -> bool {
        self.ranging_available
    }
}
