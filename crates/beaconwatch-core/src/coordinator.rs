//! The beacon coordinator: owner of the tracked set and monitoring state.
//!
//! [`BeaconCoordinator`] is the only component that mutates [`BeaconRecord`]s
//! or talks to the [`LocationService`]. It reacts to two user actions
//! ([`add_beacon`](BeaconCoordinator::add_beacon),
//! [`toggle_monitoring`](BeaconCoordinator::toggle_monitoring)) and to
//! [`PlatformEvent`]s. Every mutation publishes a fresh [`TrackedSnapshot`] on
//! a `watch` channel; observers re-read the whole snapshot rather than deltas.
//!
//! Monitoring is a two-state machine, initially off, changed only by the user:
//!
//! ```text
//!            toggle: start monitoring every region
//!   Inactive ─────────────────────────────────────▶ Active
//!      ▲                                              │
//!      └──────────────────────────────────────────────┘
//!        toggle: stop monitoring + ranging, reset records
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::beacon::{identifier_label, parse_identifier, BeaconRecord, BeaconRegion, RegionState};
use crate::error::Result;
use crate::platform::{LocationService, PlatformEvent};
use crate::storage::IdentifierStore;

/// Immutable view of the coordinator state, published after every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedSnapshot {
    /// Increases by one with every published change.
    pub revision: u64,
    /// Whether monitoring is active.
    pub is_monitoring: bool,
    /// Tracked beacons in insertion order.
    pub beacons: Vec<BeaconRecord>,
}

/// Result of [`BeaconCoordinator::add_beacon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new record was appended.
    Added,
    /// The identifier was already tracked; nothing changed.
    AlreadyTracked,
}

/// Owns the tracked beacons and drives the platform location service.
pub struct BeaconCoordinator<S, P> {
    service: S,
    store: P,
    beacons: Vec<BeaconRecord>,
    is_monitoring: bool,
    revision: u64,
    updates: watch::Sender<TrackedSnapshot>,
}

impl<S, P> BeaconCoordinator<S, P>
where
    S: LocationService,
    P: IdentifierStore,
{
    /// Create a coordinator with an empty tracked set and monitoring off.
    pub fn new(service: S, store: P) -> Self {
        let (updates, _) = watch::channel(TrackedSnapshot::default());
        Self {
            service,
            store,
            beacons: Vec::new(),
            is_monitoring: false,
            revision: 0,
            updates,
        }
    }

    /// Load persisted identifiers and report platform capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn setup(&mut self) -> Result<usize> {
        let loaded = self.load_tracked()?;
        if self.service.is_monitoring_available() {
            info!(tracked = self.beacons.len(), "Beacon monitoring is available");
        } else {
            warn!("Beacon monitoring is not available on this device");
        }
        if !self.service.is_ranging_available() {
            warn!("Beacon ranging is not available; regions will be monitored only");
        }
        Ok(loaded)
    }

    /// Start tracking an identifier.
    ///
    /// Adding an identifier that is already tracked is a logged no-op. The
    /// record is kept in memory even if persisting the list fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated list cannot be persisted.
    pub fn add_beacon(&mut self, identifier: Uuid) -> Result<AddOutcome> {
        if self.position(identifier).is_some() {
            info!(identifier = %identifier_label(&identifier), "Beacon already exists");
            return Ok(AddOutcome::AlreadyTracked);
        }

        self.beacons.push(BeaconRecord::new(identifier));
        info!(identifier = %identifier_label(&identifier), "Added beacon");
        self.publish();
        self.persist()?;
        Ok(AddOutcome::Added)
    }

    /// Append a record for every persisted identifier not yet tracked.
    ///
    /// Safe to call repeatedly. Stored entries that are not valid identifiers
    /// are skipped. Returns how many records were added.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load_tracked(&mut self) -> Result<usize> {
        let stored = self.store.load()?;
        let mut added = 0;

        for text in &stored {
            let Some(identifier) = parse_identifier(text) else {
                warn!(value = %text, "Skipping malformed stored identifier");
                continue;
            };
            if self.position(identifier).is_none() {
                self.beacons.push(BeaconRecord::new(identifier));
                added += 1;
            }
        }

        if added > 0 {
            debug!(added, "Loaded tracked beacons");
            self.publish();
        }
        Ok(added)
    }

    /// Flip monitoring on or off. Returns the new state.
    ///
    /// Turning on starts monitoring every tracked region. Turning off stops
    /// monitoring and ranging for every region and resets every record.
    pub fn toggle_monitoring(&mut self) -> bool {
        if self.is_monitoring {
            for record in &mut self.beacons {
                let region = BeaconRegion::new(record.identifier);
                self.service.stop_monitoring(&region);
                self.service.stop_ranging(&region);
                record.reset();
            }
        } else {
            for record in &self.beacons {
                self.service
                    .start_monitoring(&BeaconRegion::new(record.identifier));
            }
        }

        self.is_monitoring = !self.is_monitoring;
        info!(
            monitoring = self.is_monitoring,
            regions = self.beacons.len(),
            "Monitoring {}",
            if self.is_monitoring { "started" } else { "stopped" }
        );
        self.publish();
        self.is_monitoring
    }

    /// Apply one platform callback.
    ///
    /// While monitoring is off, events that would start ranging or mark a
    /// region as inside are dropped: they were queued before the stop requests
    /// took effect. Exits still apply and failures are always logged.
    pub fn handle_event(&mut self, event: PlatformEvent) {
        if !self.is_monitoring
            && matches!(
                event,
                PlatformEvent::MonitoringStarted { .. }
                    | PlatformEvent::StateDetermined { .. }
                    | PlatformEvent::RegionEntered { .. }
                    | PlatformEvent::BeaconsRanged { .. }
            )
        {
            debug!(?event, "Ignoring platform event while monitoring is off");
            return;
        }

        let changed = match event {
            PlatformEvent::MonitoringStarted { region } => {
                info!(region = %identifier_label(&region), "Monitoring started for region");
                self.service.request_state(&BeaconRegion::new(region));
                false
            }
            PlatformEvent::StateDetermined { region, state } => {
                self.on_state_determined(region, state)
            }
            PlatformEvent::RegionEntered { region } => {
                info!(region = %identifier_label(&region), "Entered beacon region");
                self.start_ranging_if_available(region);
                self.update(region, |record| record.region_state = RegionState::Inside)
            }
            PlatformEvent::RegionExited { region } => {
                info!(region = %identifier_label(&region), "Exited beacon region");
                self.service.stop_ranging(&BeaconRegion::new(region));
                self.update(region, |record| {
                    record.region_state = RegionState::Outside;
                    record.highlighted = false;
                })
            }
            PlatformEvent::BeaconsRanged { region, beacons } => {
                let now = Utc::now();
                let mut changed = false;
                for ranged in &beacons {
                    debug!(
                        region = %identifier_label(&region),
                        identifier = %identifier_label(&ranged.identifier),
                        major = ranged.major,
                        minor = ranged.minor,
                        rssi = ranged.rssi,
                        "Beacon in range"
                    );
                    changed |= self.update(ranged.identifier, |record| {
                        record.apply_ranged(ranged, now);
                    });
                }
                changed
            }
            PlatformEvent::MonitoringFailed { region, message } => {
                error!(region = ?region, %message, "Region monitoring failed");
                false
            }
            PlatformEvent::RangingFailed { region, message } => {
                error!(region = %identifier_label(&region), %message, "Beacon ranging failed");
                false
            }
            PlatformEvent::ServiceFailed { message } => {
                error!(%message, "Location service failed");
                false
            }
        };

        if changed {
            self.publish();
        }
    }

    /// Tracked records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[BeaconRecord] {
        &self.beacons
    }

    /// Look up a record by identifier.
    #[must_use]
    pub fn record(&self, identifier: Uuid) -> Option<&BeaconRecord> {
        self.beacons.iter().find(|r| r.identifier == identifier)
    }

    /// Whether monitoring is active.
    #[must_use]
    pub const fn is_monitoring(&self) -> bool {
        self.is_monitoring
    }

    /// Current state as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TrackedSnapshot {
        TrackedSnapshot {
            revision: self.revision,
            is_monitoring: self.is_monitoring,
            beacons: self.beacons.clone(),
        }
    }

    /// Subscribe to published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrackedSnapshot> {
        self.updates.subscribe()
    }

    /// The platform service.
    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// The identifier store.
    #[must_use]
    pub const fn store(&self) -> &P {
        &self.store
    }

    fn on_state_determined(&mut self, region: Uuid, state: RegionState) -> bool {
        debug!(region = %identifier_label(&region), ?state, "Region state determined");
        if state == RegionState::Inside {
            self.start_ranging_if_available(region);
            self.update(region, |record| record.region_state = RegionState::Inside)
        } else {
            self.service.stop_ranging(&BeaconRegion::new(region));
            self.update(region, |record| record.highlighted = false)
        }
    }

    fn start_ranging_if_available(&mut self, region: Uuid) {
        if self.service.is_ranging_available() {
            self.service.start_ranging(&BeaconRegion::new(region));
        } else {
            warn!(
                region = %identifier_label(&region),
                "Ranging not supported; region stays monitoring-only"
            );
        }
    }

    fn update(&mut self, identifier: Uuid, apply: impl FnOnce(&mut BeaconRecord)) -> bool {
        match self.beacons.iter_mut().find(|r| r.identifier == identifier) {
            Some(record) => {
                apply(record);
                true
            }
            None => false,
        }
    }

    fn position(&self, identifier: Uuid) -> Option<usize> {
        self.beacons.iter().position(|r| r.identifier == identifier)
    }

    fn persist(&mut self) -> Result<()> {
        let identifiers: Vec<String> = self
            .beacons
            .iter()
            .map(|r| identifier_label(&r.identifier))
            .collect();
        self.store.save(&identifiers)?;
        Ok(())
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = self.snapshot();
        self.updates.send_replace(snapshot);
    }
}
