//! Region monitoring and ranging from raw advertisement sightings.
//!
//! [`RegionTracker`] is the platform-side state machine behind the BlueZ
//! adapter. It is fed sightings and clock ticks and answers with the same
//! [`PlatformEvent`]s a mobile location service would deliver. Time is always
//! passed in, so the tracker is fully deterministic.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::beacon::{RangedBeacon, RegionState};
use crate::ibeacon::IBeaconAdvertisement;
use crate::platform::PlatformEvent;

/// One received advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sighting {
    /// Decoded advertisement.
    pub advertisement: IBeaconAdvertisement,
    /// Signal strength it was received with.
    pub rssi: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BeaconKey {
    identifier: Uuid,
    major: u16,
    minor: u16,
}

#[derive(Debug, Clone, Copy)]
struct LastSeen {
    sighting: Sighting,
    at: Instant,
}

/// Tracks monitored and ranged regions.
#[derive(Debug)]
pub struct RegionTracker {
    exit_timeout: Duration,
    ranging_window: Duration,
    monitored: HashMap<Uuid, RegionState>,
    ranging: HashSet<Uuid>,
    seen: HashMap<BeaconKey, LastSeen>,
}

impl RegionTracker {
    /// Create a tracker.
    #[must_use]
    pub fn new(exit_timeout: Duration, ranging_window: Duration) -> Self {
        Self {
            exit_timeout,
            ranging_window,
            monitored: HashMap::new(),
            ranging: HashSet::new(),
            seen: HashMap::new(),
        }
    }

    /// Regions currently monitored.
    pub fn monitored(&self) -> impl Iterator<Item = &Uuid> {
        self.monitored.keys()
    }

    /// Whether a region is being ranged.
    #[must_use]
    pub fn is_ranging(&self, region: &Uuid) -> bool {
        self.ranging.contains(region)
    }

    /// Begin monitoring a region.
    pub fn start_monitoring(&mut self, region: Uuid) -> Vec<PlatformEvent> {
        self.monitored.entry(region).or_insert(RegionState::Unknown);
        vec![PlatformEvent::MonitoringStarted { region }]
    }

    /// Stop monitoring a region and forget its state.
    pub fn stop_monitoring(&mut self, region: Uuid) {
        self.monitored.remove(&region);
    }

    /// Begin ranging a region.
    pub fn start_ranging(&mut self, region: Uuid) {
        self.ranging.insert(region);
    }

    /// Stop ranging a region.
    pub fn stop_ranging(&mut self, region: Uuid) {
        self.ranging.remove(&region);
    }

    /// Report the current state of a region.
    pub fn request_state(&mut self, region: Uuid, now: Instant) -> Vec<PlatformEvent> {
        let state = if self.seen_recently(region, now) {
            RegionState::Inside
        } else {
            RegionState::Outside
        };
        if let Some(current) = self.monitored.get_mut(&region) {
            *current = state;
        }
        vec![PlatformEvent::StateDetermined { region, state }]
    }

    /// Record an advertisement. Emits `RegionEntered` when a monitored region
    /// becomes occupied.
    pub fn record_sighting(&mut self, sighting: Sighting, now: Instant) -> Vec<PlatformEvent> {
        let adv = sighting.advertisement;
        let key = BeaconKey {
            identifier: adv.identifier,
            major: adv.major,
            minor: adv.minor,
        };
        self.seen.insert(key, LastSeen { sighting, at: now });

        match self.monitored.get_mut(&adv.identifier) {
            Some(state) if *state != RegionState::Inside => {
                *state = RegionState::Inside;
                vec![PlatformEvent::RegionEntered {
                    region: adv.identifier,
                }]
            }
            _ => Vec::new(),
        }
    }

    /// Advance the clock: emit exits for regions gone quiet and one ranging
    /// pass per ranged region.
    pub fn tick(&mut self, now: Instant) -> Vec<PlatformEvent> {
        let mut events = Vec::new();

        let mut exited: Vec<Uuid> = self
            .monitored
            .iter()
            .filter(|(_, state)| **state == RegionState::Inside)
            .map(|(region, _)| *region)
            .filter(|region| !self.seen_recently(*region, now))
            .collect();
        exited.sort_unstable();
        for region in exited {
            self.monitored.insert(region, RegionState::Outside);
            events.push(PlatformEvent::RegionExited { region });
        }

        let mut ranged: Vec<Uuid> = self.ranging.iter().copied().collect();
        ranged.sort_unstable();
        for region in ranged {
            events.push(PlatformEvent::BeaconsRanged {
                region,
                beacons: self.ranged_beacons(region, now),
            });
        }

        let keep_for = self.exit_timeout.max(self.ranging_window);
        self.seen
            .retain(|_, last| now.saturating_duration_since(last.at) <= keep_for);

        events
    }

    fn seen_recently(&self, region: Uuid, now: Instant) -> bool {
        self.seen.iter().any(|(key, last)| {
            key.identifier == region
                && now.saturating_duration_since(last.at) <= self.exit_timeout
        })
    }

    fn ranged_beacons(&self, region: Uuid, now: Instant) -> Vec<RangedBeacon> {
        let mut beacons: Vec<RangedBeacon> = self
            .seen
            .iter()
            .filter(|(key, last)| {
                key.identifier == region
                    && now.saturating_duration_since(last.at) <= self.ranging_window
            })
            .map(|(_, last)| last.sighting.advertisement.ranged(last.sighting.rssi))
            .collect();
        beacons.sort_by(|a, b| b.rssi.cmp(&a.rssi).then(a.minor.cmp(&b.minor)));
        beacons
    }
}
