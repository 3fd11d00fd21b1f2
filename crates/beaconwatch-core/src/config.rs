//! Application configuration management.
//!
//! Handles loading, saving, and validating beaconwatch configuration:
//! - HTTP bind address
//! - Bluetooth adapter selection and ranging cadence
//! - Location of the identifier store
//! - Logging level and mode
//!
//! Configuration is read from an optional TOML file and then overridden by
//! `BEACONWATCH__<SECTION>__<KEY>` environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "BEACONWATCH";

/// Log levels accepted by `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    /// A single field failed validation.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields failed validation.
    #[error("Configuration has {} validation errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Bluetooth scanning and ranging settings.
    pub scanner: ScannerConfig,
    /// Identifier store settings.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Bluetooth scanning and ranging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Adapter name (e.g. `hci0`). The default adapter is used when unset.
    pub adapter_name: Option<String>,

    /// Whether ranging is offered. When false, regions are monitored only.
    pub ranging_available: bool,

    /// How often ranged readings are delivered, in milliseconds.
    pub ranging_interval_ms: u64,

    /// How recent an advertisement must be to appear in a ranging pass, in milliseconds.
    pub ranging_window_ms: u64,

    /// How long a region must go unseen before it counts as exited, in seconds.
    pub exit_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            adapter_name: None,
            ranging_available: true,
            ranging_interval_ms: 1_000,
            ranging_window_ms: 3_000,
            exit_timeout_secs: 30,
        }
    }
}

impl ScannerConfig {
    /// Ranging interval as a [`Duration`].
    #[must_use]
    pub const fn ranging_interval(&self) -> Duration {
        Duration::from_millis(self.ranging_interval_ms)
    }

    /// Ranging window as a [`Duration`].
    #[must_use]
    pub const fn ranging_window(&self) -> Duration {
        Duration::from_millis(self.ranging_window_ms)
    }

    /// Exit timeout as a [`Duration`].
    #[must_use]
    pub const fn exit_timeout(&self) -> Duration {
        Duration::from_secs(self.exit_timeout_secs)
    }
}

/// Identifier store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store file path. The platform data directory is used when unset.
    pub path: Option<PathBuf>,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when neither `RUST_LOG` nor `BEACONWATCH_LOG_LEVEL` is set.
    pub level: String,

    /// JSON file logging plus compact stdout instead of pretty stdout.
    pub production: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            production: false,
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus environment overrides.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result fails validation.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::load_from(path.as_ref(), false)
    }

    /// Load configuration, requiring the file to exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is missing, or any load or
    /// validation error.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::load_from(path, true)
    }

    fn load_from(path: &Path, required: bool) -> ConfigResult<Self> {
        let loaded: Self = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(loaded)
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns the single failure, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ConfigError::ValidationError {
                field: "server.bind_address".to_string(),
                message: format!(
                    "'{}' is not a socket address (e.g. 127.0.0.1:3000)",
                    self.server.bind_address
                ),
            });
        }

        if self.scanner.ranging_interval_ms == 0 {
            errors.push(ConfigError::ValidationError {
                field: "scanner.ranging_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.scanner.ranging_window_ms < self.scanner.ranging_interval_ms {
            errors.push(ConfigError::ValidationError {
                field: "scanner.ranging_window_ms".to_string(),
                message: "must be at least the ranging interval".to_string(),
            });
        }

        if self.scanner.exit_timeout_secs == 0 {
            errors.push(ConfigError::ValidationError {
                field: "scanner.exit_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if let Some(name) = &self.scanner.adapter_name {
            if name.trim().is_empty() {
                errors.push(ConfigError::ValidationError {
                    field: "scanner.adapter_name".to_string(),
                    message: "must not be empty when set".to_string(),
                });
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            errors.push(ConfigError::ValidationError {
                field: "logging.level".to_string(),
                message: format!(
                    "unknown level '{}', expected one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Resolve the store path, falling back to the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and no data directory exists.
    pub fn store_path(&self) -> crate::error::Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(crate::storage::default_store_path()?),
        }
    }

    /// Bind address as a [`SocketAddr`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if the address does not parse.
    pub fn bind_address(&self) -> ConfigResult<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .map_err(|_| ConfigError::ValidationError {
                field: "server.bind_address".to_string(),
                message: format!("'{}' is not a socket address", self.server.bind_address),
            })
    }
}

/// Get the configuration file path.
///
/// On Linux: `/etc/beaconwatch/config.toml`
/// Elsewhere: the platform config directory for `beaconwatch`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/beaconwatch/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "beaconwatch").map_or_else(
            || PathBuf::from("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scanner.ranging_interval(), Duration::from_secs(1));
        assert_eq!(config.scanner.exit_timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.scanner, ScannerConfig::default());
    }

    #[test]
    fn test_required_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[scanner]
adapter_name = "hci1"
exit_timeout_secs = 10

[storage]
path = "/tmp/beacons.json"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scanner.adapter_name.as_deref(), Some("hci1"));
        assert_eq!(config.scanner.exit_timeout_secs, 10);
        assert_eq!(config.scanner.ranging_interval_ms, 1_000);
        assert_eq!(config.store_path().unwrap(), PathBuf::from("/tmp/beacons.json"));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.server.bind_address = "nowhere".to_string();
        config.scanner.ranging_interval_ms = 0;
        config.logging.level = "loud".to_string();

        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_single_error() {
        let mut config = Config::default();
        config.scanner.ranging_window_ms = 10;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "scanner.ranging_window_ms"));
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner]\nexit_timeout_secs = 0\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_bind_address_parses() {
        let config = Config::default();
        assert_eq!(config.bind_address().unwrap().port(), 3000);
    }
}
