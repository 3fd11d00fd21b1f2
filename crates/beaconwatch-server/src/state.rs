//! Application state shared across handlers.

use std::sync::Arc;

use beaconwatch_core::CoordinatorHandle;
use chrono::{DateTime, Utc};

/// State handed to every handler.
pub type SharedState = Arc<AppState>;

/// Shared application state.
///
/// The coordinator lives on its own event loop; handlers only hold a
/// [`CoordinatorHandle`] to queue commands and read snapshots.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Command and snapshot access to the running coordinator.
    pub coordinator: CoordinatorHandle,

    /// Name of the Bluetooth adapter backing the location service, if any.
    pub bluetooth_adapter: Option<String>,

    /// Whether the location service can range.
    pub ranging_available: bool,

    /// When this server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        coordinator: CoordinatorHandle,
        bluetooth_adapter: Option<String>,
        ranging_available: bool,
    ) -> Self {
        Self {
            coordinator,
            bluetooth_adapter,
            ranging_available,
            started_at: Utc::now(),
        }
    }

    /// Wrap this state for use with axum.
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    /// Whether a Bluetooth adapter backs the location service.
    #[must_use]
    pub const fn bluetooth_available(&self) -> bool {
        self.bluetooth_adapter.is_some()
    }

    /// Seconds since [`AppState::started_at`].
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or(0)
    }
}
