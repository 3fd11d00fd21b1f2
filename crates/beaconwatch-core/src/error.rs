//! Unified error types for the beaconwatch core library.
//!
//! This module provides a unified error type [`BeaconError`] that covers all failure
//! modes across the beaconwatch system. Each module also has its own specific error
//! types (`ConfigError`, `StoreError`, `BluetoothError`) for internal use.
//!
//! Nothing here is fatal to the process: the coordinator logs these errors and
//! keeps running, and the HTTP layer maps them onto status codes.
//!
//! # Example
//!
//! ```rust
//! use beaconwatch_core::error::{BeaconError, Result};
//! use std::path::PathBuf;
//!
//! fn load_config(path: &PathBuf) -> Result<()> {
//!     if !path.exists() {
//!         return Err(BeaconError::ConfigNotFound(path.clone()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all beaconwatch operations.
#[derive(Debug, Error)]
pub enum BeaconError {
    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    #[error(
        "No Bluetooth adapter found. Ensure Bluetooth hardware is present and drivers are loaded."
    )]
    BluetoothAdapterNotFound,

    /// The Bluetooth adapter exists but is powered off.
    #[error("Bluetooth adapter is powered off. Run 'bluetoothctl power on' to enable.")]
    BluetoothAdapterPoweredOff,

    /// Talking to the Bluetooth stack failed.
    #[error("Bluetooth service failed: {0}")]
    BluetoothServiceFailed(String),

    // =========================================================================
    // COORDINATOR ERRORS
    // =========================================================================
    /// The event loop that owns the coordinator is no longer running.
    #[error("Beacon coordinator is not running")]
    CoordinatorStopped,

    // =========================================================================
    // IDENTIFIER ERRORS
    // =========================================================================
    /// The text is not a hyphenated 128-bit beacon identifier.
    #[error(
        "Invalid beacon identifier: '{0}'. Expected the form XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX."
    )]
    InvalidIdentifier(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading tracked identifiers.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

/// A specialized [`Result`] type for beaconwatch operations.
pub type Result<T> = std::result::Result<T, BeaconError>;

impl BeaconError {
    /// Returns `true` if this error is related to Bluetooth operations.
    #[inline]
    #[must_use]
    pub const fn is_bluetooth_error(&self) -> bool {
        matches!(
            self,
            Self::BluetoothAdapterNotFound
                | Self::BluetoothAdapterPoweredOff
                | Self::BluetoothServiceFailed(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(self, Self::PersistenceError(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidIdentifier(_) => 400,

            Self::ConfigNotFound(_) => 404,

            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            Self::PersistenceError(_) => 500,

            Self::BluetoothAdapterNotFound
            | Self::BluetoothAdapterPoweredOff
            | Self::BluetoothServiceFailed(_)
            | Self::CoordinatorStopped => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BluetoothAdapterNotFound => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::BluetoothAdapterPoweredOff => "BLUETOOTH_ADAPTER_POWERED_OFF",
            Self::BluetoothServiceFailed(_) => "BLUETOOTH_SERVICE_FAILED",
            Self::CoordinatorStopped => "COORDINATOR_STOPPED",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for BeaconError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::LoadError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::storage::StoreError> for BeaconError {
    fn from(err: crate::storage::StoreError) -> Self {
        use crate::storage::StoreError;
        match err {
            StoreError::ReadError { path, source } => {
                Self::PersistenceError(format!("Failed to read {}: {}", path.display(), source))
            }
            StoreError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {}: {}", path.display(), source))
            }
            StoreError::CreateDirError { path, source } => Self::PersistenceError(format!(
                "Failed to create directory {}: {}",
                path.display(),
                source
            )),
            StoreError::ParseError { path, source } => {
                Self::PersistenceError(format!("Failed to parse {}: {}", path.display(), source))
            }
            StoreError::MalformedValue { key } => {
                Self::PersistenceError(format!("Stored value for '{key}' is not a string list"))
            }
            StoreError::SerializeError(e) => Self::PersistenceError(e.to_string()),
            StoreError::NoDataDirectory => {
                Self::PersistenceError("Cannot determine data directory".to_string())
            }
        }
    }
}

impl From<crate::bluetooth::BluetoothError> for BeaconError {
    fn from(err: crate::bluetooth::BluetoothError) -> Self {
        use crate::bluetooth::BluetoothError;
        match err {
            BluetoothError::AdapterNotFound { .. } => Self::BluetoothAdapterNotFound,
            BluetoothError::AdapterPoweredOff => Self::BluetoothAdapterPoweredOff,
            BluetoothError::SessionInitFailed { message }
            | BluetoothError::DiscoveryFailed { message } => Self::BluetoothServiceFailed(message),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bluetooth_error_classification() {
        assert!(BeaconError::BluetoothAdapterNotFound.is_bluetooth_error());
        assert!(BeaconError::BluetoothAdapterPoweredOff.is_bluetooth_error());
        assert!(BeaconError::BluetoothServiceFailed("dbus".into()).is_bluetooth_error());

        assert!(!BeaconError::PersistenceError("disk".into()).is_bluetooth_error());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(BeaconError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(BeaconError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(BeaconError::ConfigValidationError("invalid value".into()).is_config_error());

        assert!(!BeaconError::BluetoothAdapterNotFound.is_config_error());
    }

    #[test]
    fn test_io_error_classification() {
        assert!(BeaconError::PersistenceError("disk full".into()).is_io_error());

        assert!(!BeaconError::BluetoothAdapterNotFound.is_io_error());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            BeaconError::InvalidIdentifier("nope".into()).http_status_code(),
            400
        );
        assert_eq!(
            BeaconError::ConfigNotFound(PathBuf::new()).http_status_code(),
            404
        );
        assert_eq!(
            BeaconError::ConfigParseError("error".into()).http_status_code(),
            422
        );
        assert_eq!(
            BeaconError::PersistenceError("error".into()).http_status_code(),
            500
        );
        assert_eq!(
            BeaconError::BluetoothAdapterPoweredOff.http_status_code(),
            503
        );
        assert_eq!(BeaconError::CoordinatorStopped.http_status_code(), 503);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BeaconError::BluetoothAdapterNotFound.error_code(),
            "BLUETOOTH_ADAPTER_NOT_FOUND"
        );
        assert_eq!(
            BeaconError::InvalidIdentifier(String::new()).error_code(),
            "INVALID_IDENTIFIER"
        );
    }

    #[test]
    fn test_from_store_error() {
        let err: BeaconError = crate::storage::StoreError::MalformedValue {
            key: "savedBeacons".into(),
        }
        .into();
        assert!(err.is_io_error());
        assert!(err.to_string().contains("savedBeacons"));
    }

    #[test]
    fn test_from_bluetooth_error() {
        let err: BeaconError = crate::bluetooth::BluetoothError::AdapterPoweredOff.into();
        assert!(matches!(err, BeaconError::BluetoothAdapterPoweredOff));
    }

    #[test]
    fn test_error_display_messages() {
        let err = BeaconError::InvalidIdentifier("abc".into());
        assert!(format!("{err}").contains("abc"));

        let err = BeaconError::BluetoothAdapterPoweredOff;
        assert!(format!("{err}").contains("powered off"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<BeaconError>();
        assert_sync::<BeaconError>();
    }
}
