//! BlueZ-backed beacon monitoring and ranging.
//!
//! This module provides a [`LocationService`](crate::platform::LocationService)
//! for Linux hosts:
//! - Passive LE discovery through `bluer`
//! - iBeacon decoding of manufacturer data
//! - Region entry/exit and ranging results via [`RegionTracker`](crate::region::RegionTracker)
//!
//! The adapter lives in a background task. Requests are sent to it over a
//! channel and its answers come back as [`PlatformEvent`](crate::platform::PlatformEvent)s.

use thiserror::Error;

#[cfg(feature = "bluetooth")]
pub use self::bluez::BluezLocationService;

/// Errors raised while bringing up the Bluetooth stack.
#[derive(Debug, Error)]
pub enum BluetoothError {
    /// No (matching) adapter exists.
    #[error("Bluetooth adapter not found{}", name.as_ref().map(|n| format!(": {n}")).unwrap_or_default())]
    AdapterNotFound {
        /// Requested adapter name, if any.
        name: Option<String>,
    },

    /// The adapter is powered off.
    #[error("Bluetooth adapter is powered off")]
    AdapterPoweredOff,

    /// Connecting to bluetoothd failed.
    #[error("Failed to open Bluetooth session: {message}")]
    SessionInitFailed {
        /// Underlying error text.
        message: String,
    },

    /// Configuring or starting discovery failed.
    #[error("Bluetooth discovery failed: {message}")]
    DiscoveryFailed {
        /// Underlying error text.
        message: String,
    },
}

/// Result alias for Bluetooth setup.
pub type BluetoothResult<T> = std::result::Result<T, BluetoothError>;

#[cfg(feature = "bluetooth")]
mod bluez {
    use std::time::Instant;

    use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session};
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::MissedTickBehavior;
    use tracing::{debug, info, warn};
    use uuid::Uuid;

    use super::{BluetoothError, BluetoothResult};
    use crate::beacon::BeaconRegion;
    use crate::config::ScannerConfig;
    use crate::ibeacon::IBeaconAdvertisement;
    use crate::platform::{LocationService, PlatformEvent};
    use crate::region::{RegionTracker, Sighting};

    #[derive(Debug, Clone, Copy)]
    enum ScanCommand {
        StartMonitoring(Uuid),
        StopMonitoring(Uuid),
        StartRanging(Uuid),
        StopRanging(Uuid),
        RequestState(Uuid),
    }

    /// Location service backed by a BlueZ adapter.
    #[derive(Debug)]
    pub struct BluezLocationService {
        commands: mpsc::UnboundedSender<ScanCommand>,
        adapter_name: String,
        ranging_available: bool,
    }

    impl BluezLocationService {
        /// Open the adapter and spawn the scanning task.
        ///
        /// Events are delivered on `events` until the returned service is dropped.
        ///
        /// # Errors
        ///
        /// Returns an error if no session can be opened, the adapter is missing or
        /// powered off, or the discovery filter is rejected.
        pub async fn start(
            config: &ScannerConfig,
            events: mpsc::UnboundedSender<PlatformEvent>,
        ) -> BluetoothResult<(Self, JoinHandle<()>)> {
            let session = Session::new()
                .await
                .map_err(|e| BluetoothError::SessionInitFailed {
                    message: e.to_string(),
                })?;

            let adapter = match &config.adapter_name {
                Some(name) => session
                    .adapter(name)
                    .map_err(|_| BluetoothError::AdapterNotFound {
                        name: Some(name.clone()),
                    })?,
                None => session
                    .default_adapter()
                    .await
                    .map_err(|_| BluetoothError::AdapterNotFound { name: None })?,
            };

            let powered = adapter
                .is_powered()
                .await
                .map_err(|e| BluetoothError::SessionInitFailed {
                    message: e.to_string(),
                })?;
            if !powered {
                return Err(BluetoothError::AdapterPoweredOff);
            }

            let filter = DiscoveryFilter {
                transport: DiscoveryTransport::Le,
                duplicate_data: true,
                ..Default::default()
            };
            adapter
                .set_discovery_filter(filter)
                .await
                .map_err(|e| BluetoothError::DiscoveryFailed {
                    message: e.to_string(),
                })?;

            let adapter_name = adapter.name().to_string();
            info!(adapter = %adapter_name, "Bluetooth adapter ready for beacon scanning");

            let (command_tx, command_rx) = mpsc::unbounded_channel();
            let handle = tokio::spawn(run_scanner(adapter, config.clone(), command_rx, events));

            Ok((
                Self {
                    commands: command_tx,
                    adapter_name,
                    ranging_available: config.ranging_available,
                },
                handle,
            ))
        }

        /// Name of the adapter in use.
        #[must_use]
        pub fn adapter_name(&self) -> &str {
            &self.adapter_name
        }

        fn send(&self, command: ScanCommand) {
            if self.commands.send(command).is_err() {
                warn!(?command, "Beacon scanner task has stopped; request dropped");
            }
        }
    }

    impl LocationService for BluezLocationService {
        fn start_monitoring(&mut self, region: &BeaconRegion) {
            self.send(ScanCommand::StartMonitoring(region.identifier));
        }

        fn stop_monitoring(&mut self, region: &BeaconRegion) {
            self.send(ScanCommand::StopMonitoring(region.identifier));
        }

        fn start_ranging(&mut self, region: &BeaconRegion) {
            self.send(ScanCommand::StartRanging(region.identifier));
        }

        fn stop_ranging(&mut self, region: &BeaconRegion) {
            self.send(ScanCommand::StopRanging(region.identifier));
        }

        fn request_state(&mut self, region: &BeaconRegion) {
            self.send(ScanCommand::RequestState(region.identifier));
        }

        fn is_ranging_available(&self) -> bool {
            self.ranging_available
        }
    }

    async fn run_scanner(
        adapter: Adapter,
        config: ScannerConfig,
        mut commands: mpsc::UnboundedReceiver<ScanCommand>,
        events: mpsc::UnboundedSender<PlatformEvent>,
    ) {
        let discovery = match adapter.discover_devices_with_changes().await {
            Ok(stream) => stream,
            Err(e) => {
                let failure = PlatformEvent::ServiceFailed {
                    message: format!("Failed to start discovery: {e}"),
                };
                if events.send(failure).is_err() {
                    debug!(error = %e, "Event receiver dropped before discovery failure was reported");
                }
                return;
            }
        };
        let mut discovery = Box::pin(discovery);

        let mut tracker = RegionTracker::new(config.exit_timeout(), config.ranging_window());
        let mut ticker = tokio::time::interval(config.ranging_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("Beacon scanner task started");

        loop {
            let emitted = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => apply_command(&mut tracker, command, Instant::now()),
                    None => break,
                },
                event = discovery.next() => match event {
                    Some(AdapterEvent::DeviceAdded(address)) => {
                        match read_sightings(&adapter, address).await {
                            Ok(sightings) => {
                                let now = Instant::now();
                                sightings
                                    .into_iter()
                                    .flat_map(|s| tracker.record_sighting(s, now))
                                    .collect()
                            }
                            Err(e) => {
                                debug!(%address, error = %e, "Could not read advertisement");
                                Vec::new()
                            }
                        }
                    }
                    Some(_) => Vec::new(),
                    None => {
                        let failure = PlatformEvent::ServiceFailed {
                            message: "Bluetooth discovery stream ended".to_string(),
                        };
                        if events.send(failure).is_err() {
                            debug!("Event receiver dropped before end of discovery was reported");
                        }
                        break;
                    }
                },
                _ = ticker.tick() => tracker.tick(Instant::now()),
            };

            for event in emitted {
                if events.send(event).is_err() {
                    debug!("Event receiver dropped; stopping beacon scanner");
                    return;
                }
            }
        }

        debug!("Beacon scanner task stopped");
    }

    fn apply_command(
        tracker: &mut RegionTracker,
        command: ScanCommand,
        now: Instant,
    ) -> Vec<PlatformEvent> {
        match command {
            ScanCommand::StartMonitoring(region) => tracker.start_monitoring(region),
            ScanCommand::StopMonitoring(region) => {
                tracker.stop_monitoring(region);
                Vec::new()
            }
            ScanCommand::StartRanging(region) => {
                tracker.start_ranging(region);
                Vec::new()
            }
            ScanCommand::StopRanging(region) => {
                tracker.stop_ranging(region);
                Vec::new()
            }
            ScanCommand::RequestState(region) => tracker.request_state(region, now),
        }
    }

    async fn read_sightings(adapter: &Adapter, address: Address) -> bluer::Result<Vec<Sighting>> {
        let device = adapter.device(address)?;
        let Some(rssi) = device.rssi().await? else {
            return Ok(Vec::new());
        };
        let data = device.manufacturer_data().await?.unwrap_or_default();

        Ok(data
            .iter()
            .filter_map(|(company_id, bytes)| {
                IBeaconAdvertisement::from_manufacturer_data(*company_id, bytes)
            })
            .map(|advertisement| Sighting { advertisement, rssi })
            .collect())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::time::Duration;

        #[test]
        fn test_apply_command_routes_to_tracker() {
            let mut tracker = RegionTracker::new(Duration::from_secs(30), Duration::from_secs(3));
            let id = Uuid::new_v4();
            let now = Instant::now();

            let events = apply_command(&mut tracker, ScanCommand::StartMonitoring(id), now);
            assert_eq!(events, vec![PlatformEvent::MonitoringStarted { region: id }]);

            assert!(apply_command(&mut tracker, ScanCommand::StartRanging(id), now).is_empty());
            assert!(tracker.is_ranging(&id));

            let events = apply_command(&mut tracker, ScanCommand::RequestState(id), now);
            assert_eq!(events.len(), 1);

            apply_command(&mut tracker, ScanCommand::StopRanging(id), now);
            apply_command(&mut tracker, ScanCommand::StopMonitoring(id), now);
            assert!(!tracker.is_ranging(&id));
            assert_eq!(tracker.monitored().count(), 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_not_found_message() {
        let named = BluetoothError::AdapterNotFound {
            name: Some("hci9".into()),
        };
        assert!(named.to_string().contains("hci9"));

        let unnamed = BluetoothError::AdapterNotFound { name: None };
        assert_eq!(unnamed.to_string(), "Bluetooth adapter not found");
    }
}
