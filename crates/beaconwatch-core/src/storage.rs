//! Persistent storage for the tracked identifier list.
//!
//! The store is a small key-value document. Beaconwatch uses exactly one key,
//! [`SAVED_BEACONS_KEY`], holding the ordered list of identifier strings. The
//! list is rewritten in full on every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Key under which the tracked identifiers are stored.
pub const SAVED_BEACONS_KEY: &str = "savedBeacons";

/// File name of the key-value document inside the data directory.
const STORE_FILE_NAME: &str = "store.json";

/// Errors from identifier persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read the store file.
    #[error("Failed to read store file {}: {source}", path.display())]
    ReadError {
        /// Store file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the store file.
    #[error("Failed to write store file {}: {source}", path.display())]
    WriteError {
        /// Store file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the data directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDirError {
        /// Directory path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store file is not a JSON object.
    #[error("Failed to parse store file {}: {source}", path.display())]
    ParseError {
        /// Store file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The key exists but does not hold a list of strings.
    #[error("Value stored under '{key}' is not a list of strings")]
    MalformedValue {
        /// The offending key.
        key: String,
    },

    /// Failed to serialize the document.
    #[error("Failed to serialize store: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// No platform data directory could be determined.
    #[error("Cannot determine data directory")]
    NoDataDirectory,
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Loads and saves the ordered list of tracked identifiers.
pub trait IdentifierStore {
    /// Read the persisted list. A store that was never written yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or parsed.
    fn load(&self) -> StoreResult<Vec<String>>;

    /// Replace the persisted list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&mut self, identifiers: &[String]) -> StoreResult<()>;
}

/// JSON file-backed key-value store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default platform location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoDataDirectory`] if no data directory can be determined.
    pub fn at_default_location() -> StoreResult<Self> {
        Ok(Self::new(default_store_path()?))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> StoreResult<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| StoreError::ReadError {
            path: self.path.clone(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::ParseError {
            path: self.path.clone(),
            source,
        })
    }

    fn write_document(&self, document: &BTreeMap<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDirError {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(|source| StoreError::WriteError {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::WriteError {
            path: self.path.clone(),
            source,
        })
    }
}

impl IdentifierStore for JsonFileStore {
    fn load(&self) -> StoreResult<Vec<String>> {
        let document = self.read_document()?;
        match document.get(SAVED_BEACONS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| StoreError::MalformedValue {
                            key: SAVED_BEACONS_KEY.to_string(),
                        })
                })
                .collect(),
            Some(_) => Err(StoreError::MalformedValue {
                key: SAVED_BEACONS_KEY.to_string(),
            }),
        }
    }

    fn save(&mut self, identifiers: &[String]) -> StoreResult<()> {
        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(StoreError::ParseError { path, source }) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %source,
                    "Store file is unreadable; overwriting it"
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        document.insert(
            SAVED_BEACONS_KEY.to_string(),
            Value::Array(identifiers.iter().cloned().map(Value::String).collect()),
        );
        self.write_document(&document)?;
        tracing::debug!(
            path = %self.path.display(),
            count = identifiers.len(),
            "Saved tracked identifiers"
        );
        Ok(())
    }
}

/// In-memory store, mainly for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    identifiers: Vec<String>,
    saves: usize,
}

impl MemoryStore {
    /// Store pre-populated with identifiers.
    #[must_use]
    pub fn with_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            saves: 0,
        }
    }

    /// The currently stored list.
    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// How many times `save` has been called.
    #[must_use]
    pub const fn save_count(&self) -> usize {
        self.saves
    }
}

impl IdentifierStore for MemoryStore {
    fn load(&self) -> StoreResult<Vec<String>> {
        Ok(self.identifiers.clone())
    }

    fn save(&mut self, identifiers: &[String]) -> StoreResult<()> {
        self.identifiers = identifiers.to_vec();
        self.saves += 1;
        Ok(())
    }
}

/// Get the default data directory.
///
/// On Linux: `/var/lib/beaconwatch/`
/// Elsewhere: the platform data directory for `beaconwatch`.
///
/// # Errors
///
/// Returns [`StoreError::NoDataDirectory`] if no data directory can be determined.
pub fn default_data_dir() -> StoreResult<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Ok(PathBuf::from("/var/lib/beaconwatch"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "beaconwatch")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(StoreError::NoDataDirectory)
    }
}

/// Get the default store file path.
///
/// # Errors
///
/// Returns [`StoreError::NoDataDirectory`] if no data directory can be determined.
pub fn default_store_path() -> StoreResult<PathBuf> {
    Ok(default_data_dir()?.join(STORE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("store.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let (_dir, store) = temp_store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let (_dir, mut store) = temp_store();
        let ids = vec![
            "E2C56DB5-DFFB-48D2-B060-D0F5A71096E0".to_string(),
            "B9407F30-F5F8-466E-AFF9-25556B57FE6D".to_string(),
        ];
        store.save(&ids).unwrap();
        assert_eq!(store.load().unwrap(), ids);

        store.save(&ids[1..]).unwrap();
        assert_eq!(store.load().unwrap(), ids[1..].to_vec());
    }

    #[test]
    fn test_save_keeps_other_keys() {
        let (_dir, mut store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"theme": "dark"}"#).unwrap();

        store.save(&["A".to_string()]).unwrap();

        let raw: BTreeMap<String, Value> =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw.get("theme"), Some(&Value::String("dark".into())));
        assert_eq!(store.load().unwrap(), vec!["A".to_string()]);
    }

    #[test]
    fn test_malformed_value_is_error() {
        let (_dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"savedBeacons": "oops"}"#).unwrap();

        assert!(matches!(store.load(), Err(StoreError::MalformedValue { .. })));
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let (_dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.load(), Err(StoreError::ParseError { .. })));
    }

    #[test]
    fn test_save_overwrites_corrupt_file() {
        let (_dir, mut store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{truncated").unwrap();

        let ids = vec!["E2C56DB5-DFFB-48D2-B060-D0F5A71096E0".to_string()];
        store.save(&ids).unwrap();
        assert_eq!(store.load().unwrap(), ids);
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let mut store = MemoryStore::with_identifiers(["A"]);
        assert_eq!(store.load().unwrap(), vec!["A".to_string()]);

        store.save(&["A".to_string(), "B".to_string()]).unwrap();
        assert_eq!(store.identifiers().len(), 2);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_default_store_path_file_name() {
        let path = default_store_path().unwrap();
        assert!(path.ends_with(STORE_FILE_NAME));
    }
}
