//! The single execution context that drives the coordinator.
//!
//! User commands and platform events arrive on separate channels and are
//! applied one at a time by [`run_event_loop`]. Nothing else touches the
//! coordinator, so no locking is needed. Callers never wait for a command to
//! take effect; they observe it through the next published snapshot.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::beacon::parse_identifier;
use crate::coordinator::{BeaconCoordinator, TrackedSnapshot};
use crate::error::{BeaconError, Result};
use crate::platform::{LocationService, PlatformEvent};
use crate::storage::IdentifierStore;

/// Default capacity of the user command channel.
pub const DEFAULT_COMMAND_BUFFER: usize = 32;

/// The two commands the presentation layer may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Track a new identifier.
    AddBeacon(Uuid),
    /// Flip monitoring on or off.
    ToggleMonitoring,
}

/// Apply commands and events until the command channel closes.
///
/// Returns the coordinator so callers can inspect its final state.
pub async fn run_event_loop<S, P>(
    mut coordinator: BeaconCoordinator<S, P>,
    mut commands: mpsc::Receiver<UserCommand>,
    mut events: mpsc::UnboundedReceiver<PlatformEvent>,
) -> BeaconCoordinator<S, P>
where
    S: LocationService,
    P: IdentifierStore,
{
    info!("Beacon event loop started");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => apply_command(&mut coordinator, command),
                None => break,
            },
            Some(event) = events.recv() => {
                debug!(?event, "Platform event");
                coordinator.handle_event(event);
            }
        }
    }

    info!("Beacon event loop stopped");
    coordinator
}

fn apply_command<S, P>(coordinator: &mut BeaconCoordinator<S, P>, command: UserCommand)
where
    S: LocationService,
    P: IdentifierStore,
{
    match command {
        UserCommand::AddBeacon(identifier) => {
            if let Err(e) = coordinator.add_beacon(identifier) {
                error!(error = %e, "Failed to persist tracked beacons");
            }
        }
        UserCommand::ToggleMonitoring => {
            coordinator.toggle_monitoring();
        }
    }
}

/// Spawn [`run_event_loop`] and return a handle for issuing commands.
pub fn spawn_event_loop<S, P>(
    coordinator: BeaconCoordinator<S, P>,
    events: mpsc::UnboundedReceiver<PlatformEvent>,
) -> (CoordinatorHandle, JoinHandle<BeaconCoordinator<S, P>>)
where
    S: LocationService + Send + 'static,
    P: IdentifierStore + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(DEFAULT_COMMAND_BUFFER);
    let handle = CoordinatorHandle::new(command_tx, coordinator.subscribe());
    let task = tokio::spawn(run_event_loop(coordinator, command_rx, events));
    (handle, task)
}

/// Cloneable access to a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<UserCommand>,
    updates: watch::Receiver<TrackedSnapshot>,
}

impl CoordinatorHandle {
    /// Build a handle from its channels.
    #[must_use]
    pub const fn new(
        commands: mpsc::Sender<UserCommand>,
        updates: watch::Receiver<TrackedSnapshot>,
    ) -> Self {
        Self { commands, updates }
    }

    /// Parse user text and queue it for tracking.
    ///
    /// Malformed text is ignored and reported as `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`BeaconError::CoordinatorStopped`] if the event loop has exited.
    pub async fn submit_identifier(&self, text: &str) -> Result<bool> {
        let Some(identifier) = parse_identifier(text) else {
            debug!(input = %text, "Ignoring malformed beacon identifier");
            return Ok(false);
        };
        self.send(UserCommand::AddBeacon(identifier)).await?;
        Ok(true)
    }

    /// Queue a monitoring toggle.
    ///
    /// # Errors
    ///
    /// Returns [`BeaconError::CoordinatorStopped`] if the event loop has exited.
    pub async fn toggle_monitoring(&self) -> Result<()> {
        self.send(UserCommand::ToggleMonitoring).await
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TrackedSnapshot {
        self.updates.borrow().clone()
    }

    /// A fresh receiver for snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrackedSnapshot> {
        self.updates.clone()
    }

    /// Whether the event loop is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn send(&self, command: UserCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| BeaconError::CoordinatorStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::{ProximityCategory, RangedBeacon, RegionState};
    use crate::platform::{RecordingLocationService, ServiceRequest};
    use crate::storage::MemoryStore;

    const SAMPLE: &str = "E2C56DB5-DFFB-48D2-B060-D0F5A71096E0";

    async fn wait_for(
        rx: &mut watch::Receiver<TrackedSnapshot>,
        predicate: impl Fn(&TrackedSnapshot) -> bool,
    ) -> TrackedSnapshot {
        let snapshot = rx.wait_for(|s| predicate(s)).await.unwrap();
        snapshot.clone()
    }

    #[tokio::test]
    async fn test_commands_flow_through_loop() {
        let coordinator =
            BeaconCoordinator::new(RecordingLocationService::default(), MemoryStore::default());
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (handle, task) = spawn_event_loop(coordinator, event_rx);
        let mut rx = handle.subscribe();

        assert!(handle.submit_identifier(SAMPLE).await.unwrap());
        let snapshot = wait_for(&mut rx, |s| s.beacons.len() == 1).await;
        assert!(!snapshot.is_monitoring);

        handle.toggle_monitoring().await.unwrap();
        let snapshot = wait_for(&mut rx, |s| s.is_monitoring).await;
        assert_eq!(snapshot.beacons.len(), 1);

        drop(handle);
        drop(rx);
        let coordinator = task.await.unwrap();
        assert_eq!(
            coordinator.service().requests(),
            &[ServiceRequest::StartMonitoring(parse_identifier(SAMPLE).unwrap())]
        );
        assert_eq!(coordinator.store().identifiers(), &[SAMPLE.to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_identifier_is_ignored() {
        let coordinator =
            BeaconCoordinator::new(RecordingLocationService::default(), MemoryStore::default());
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (handle, task) = spawn_event_loop(coordinator, event_rx);

        assert!(!handle.submit_identifier("not-a-beacon").await.unwrap());

        drop(handle);
        let coordinator = task.await.unwrap();
        assert!(coordinator.records().is_empty());
        assert_eq!(coordinator.store().save_count(), 0);
    }

    #[tokio::test]
    async fn test_platform_events_update_snapshot() {
        let identifier = parse_identifier(SAMPLE).unwrap();
        let mut coordinator =
            BeaconCoordinator::new(RecordingLocationService::default(), MemoryStore::default());
        tokio_test::assert_ok!(coordinator.add_beacon(identifier));

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (handle, task) = spawn_event_loop(coordinator, event_rx);
        let mut rx = handle.subscribe();

        event_tx
            .send(PlatformEvent::RegionEntered { region: identifier })
            .unwrap();
        event_tx
            .send(PlatformEvent::BeaconsRanged {
                region: identifier,
                beacons: vec![RangedBeacon {
                    identifier,
                    major: 0,
                    minor: 0,
                    proximity: ProximityCategory::Near,
                    accuracy_m: 1.5,
                    rssi: -60,
                }],
            })
            .unwrap();

        let snapshot = wait_for(&mut rx, |s| s.beacons[0].highlighted).await;
        assert_eq!(snapshot.beacons[0].region_state, RegionState::Inside);
        assert_eq!(snapshot.beacons[0].signal_strength(), Some(-60));

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_commands_fail_after_loop_stops() {
        let (command_tx, command_rx) = mpsc::channel(1);
        let (_snapshot_tx, snapshot_rx) = watch::channel(TrackedSnapshot::default());
        let handle = CoordinatorHandle::new(command_tx, snapshot_rx);
        drop(command_rx);

        assert!(!handle.is_running());
        let err = handle.toggle_monitoring().await.unwrap_err();
        assert!(matches!(err, BeaconError::CoordinatorStopped));
    }
}
