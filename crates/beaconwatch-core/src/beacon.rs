//! Tracked beacon records and the identifiers that key them.
//!
//! A [`BeaconRecord`] mirrors the last observation the platform delivered for
//! one beacon identifier. Records are created empty and mutated only by the
//! [`BeaconCoordinator`](crate::coordinator::BeaconCoordinator).

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{BeaconError, Result};

/// Hyphenated 8-4-4-4-12 form. Simple, braced and URN forms are not accepted.
// The pattern is a constant, so compiling it cannot fail at runtime.
static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
        .expect("Invalid identifier regex")
});

/// Parse user-entered text into a beacon identifier.
///
/// Surrounding whitespace is ignored. Returns `None` for anything that is not
/// a hyphenated 128-bit UUID.
#[must_use]
pub fn parse_identifier(text: &str) -> Option<Uuid> {
    let trimmed = text.trim();
    if !IDENTIFIER_REGEX.is_match(trimmed) {
        return None;
    }
    Uuid::parse_str(trimmed).ok()
}

/// Like [`parse_identifier`], but reports malformed text as an error.
///
/// # Errors
///
/// Returns [`BeaconError::InvalidIdentifier`] if the text is not a hyphenated UUID.
pub fn require_identifier(text: &str) -> Result<Uuid> {
    parse_identifier(text).ok_or_else(|| BeaconError::InvalidIdentifier(text.to_string()))
}

/// Canonical upper-case hyphenated form, used for persistence and region labels.
#[must_use]
pub fn identifier_label(identifier: &Uuid) -> String {
    identifier
        .hyphenated()
        .encode_upper(&mut Uuid::encode_buffer())
        .to_string()
}

/// Coarse distance bucket reported for a ranged beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProximityCategory {
    /// Within roughly half a metre.
    Immediate,
    /// Within a few metres.
    Near,
    /// Further than a few metres.
    Far,
    /// No usable estimate.
    Unknown,
}

impl ProximityCategory {
    /// Bucket an accuracy estimate in metres. Negative values mean unknown.
    #[must_use]
    pub fn from_accuracy(accuracy_m: f64) -> Self {
        if accuracy_m < 0.0 || accuracy_m.is_nan() {
            Self::Unknown
        } else if accuracy_m < 0.5 {
            Self::Immediate
        } else if accuracy_m < 4.0 {
            Self::Near
        } else {
            Self::Far
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Immediate => "Immediate",
            Self::Near => "Near",
            Self::Far => "Far",
            Self::Unknown => "Unknown",
        }
    }
}

/// Whether the device is believed to be within range of a beacon region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegionState {
    /// Not determined yet, or monitoring is off.
    #[default]
    Unknown,
    /// Inside the region.
    Inside,
    /// Outside the region.
    Outside,
}

/// A region keyed by a beacon identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeaconRegion {
    /// Proximity UUID shared by every beacon in the region.
    pub identifier: Uuid,
}

impl BeaconRegion {
    /// Region for a single identifier.
    #[must_use]
    pub const fn new(identifier: Uuid) -> Self {
        Self { identifier }
    }
}

/// One beacon reading delivered by a ranging pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedBeacon {
    /// Proximity UUID of the beacon.
    pub identifier: Uuid,
    /// Major value from the advertisement.
    pub major: u16,
    /// Minor value from the advertisement.
    pub minor: u16,
    /// Bucketed proximity.
    pub proximity: ProximityCategory,
    /// Estimated distance in metres, negative when unknown.
    pub accuracy_m: f64,
    /// Received signal strength in dBm.
    pub rssi: i16,
}

/// The last observation stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Observation {
    /// Bucketed proximity.
    pub proximity: ProximityCategory,
    /// Estimated distance in metres.
    pub accuracy_m: f64,
    /// Received signal strength in dBm.
    pub rssi: i16,
    /// When the observation was applied.
    pub observed_at_utc: DateTime<Utc>,
}

/// One tracked beacon identifier and its last-known observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BeaconRecord {
    /// Primary key, unique within the tracked set.
    pub identifier: Uuid,
    /// Last ranged observation, absent until the first one arrives.
    pub observation: Option<Observation>,
    /// Current region membership.
    pub region_state: RegionState,
    /// Set when an observation arrived since the last reset.
    pub highlighted: bool,
}

impl BeaconRecord {
    /// A record with nothing observed yet.
    #[must_use]
    pub const fn new(identifier: Uuid) -> Self {
        Self {
            identifier,
            observation: None,
            region_state: RegionState::Unknown,
            highlighted: false,
        }
    }

    /// Last reported proximity bucket.
    #[must_use]
    pub fn proximity(&self) -> Option<ProximityCategory> {
        self.observation.map(|o| o.proximity)
    }

    /// Last reported distance estimate in metres.
    #[must_use]
    pub fn estimated_distance_meters(&self) -> Option<f64> {
        self.observation.map(|o| o.accuracy_m)
    }

    /// Last reported signal strength.
    #[must_use]
    pub fn signal_strength(&self) -> Option<i16> {
        self.observation.map(|o| o.rssi)
    }

    /// Apply a ranged reading and highlight the record.
    pub fn apply_ranged(&mut self, ranged: &RangedBeacon, now: DateTime<Utc>) {
        self.observation = Some(Observation {
            proximity: ranged.proximity,
            accuracy_m: ranged.accuracy_m,
            rssi: ranged.rssi,
            observed_at_utc: now,
        });
        self.highlighted = true;
    }

    /// Return to the not-monitoring appearance.
    pub fn reset(&mut self) {
        self.observation = None;
        self.region_state = RegionState::Unknown;
        self.highlighted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "E2C56DB5-DFFB-48D2-B060-D0F5A71096E0";

    #[test]
    fn test_parse_identifier_accepts_hyphenated() {
        let id = parse_identifier(SAMPLE).unwrap();
        assert_eq!(identifier_label(&id), SAMPLE);

        let lower = parse_identifier(&SAMPLE.to_lowercase()).unwrap();
        assert_eq!(lower, id);

        assert_eq!(parse_identifier(&format!("  {SAMPLE}\n")), Some(id));
    }

    #[test]
    fn test_parse_identifier_rejects_other_forms() {
        assert!(parse_identifier("").is_none());
        assert!(parse_identifier("not a uuid").is_none());
        assert!(parse_identifier("E2C56DB5DFFB48D2B060D0F5A71096E0").is_none());
        assert!(parse_identifier("{E2C56DB5-DFFB-48D2-B060-D0F5A71096E0}").is_none());
        assert!(parse_identifier("urn:uuid:E2C56DB5-DFFB-48D2-B060-D0F5A71096E0").is_none());
        assert!(parse_identifier("E2C56DB5-DFFB-48D2-B060-D0F5A71096EZ").is_none());
    }

    #[test]
    fn test_require_identifier_error() {
        let err = require_identifier("bogus").unwrap_err();
        assert!(matches!(err, BeaconError::InvalidIdentifier(ref s) if s == "bogus"));
    }

    #[test]
    fn test_proximity_from_accuracy() {
        assert_eq!(ProximityCategory::from_accuracy(-1.0), ProximityCategory::Unknown);
        assert_eq!(ProximityCategory::from_accuracy(0.2), ProximityCategory::Immediate);
        assert_eq!(ProximityCategory::from_accuracy(1.5), ProximityCategory::Near);
        assert_eq!(ProximityCategory::from_accuracy(12.0), ProximityCategory::Far);
    }

    #[test]
    fn test_record_apply_and_reset() {
        let id = parse_identifier(SAMPLE).unwrap();
        let mut record = BeaconRecord::new(id);
        assert!(record.proximity().is_none());
        assert!(!record.highlighted);

        record.region_state = RegionState::Inside;
        record.apply_ranged(
            &RangedBeacon {
                identifier: id,
                major: 1,
                minor: 2,
                proximity: ProximityCategory::Near,
                accuracy_m: 1.5,
                rssi: -60,
            },
            Utc::now(),
        );
        assert_eq!(record.proximity(), Some(ProximityCategory::Near));
        assert_eq!(record.estimated_distance_meters(), Some(1.5));
        assert_eq!(record.signal_strength(), Some(-60));
        assert!(record.highlighted);

        record.reset();
        assert_eq!(record, BeaconRecord::new(id));
    }

    #[test]
    fn test_identifier_label_is_upper_case() {
        let identifier = parse_identifier(&SAMPLE.to_lowercase()).unwrap();
        assert_eq!(identifier_label(&identifier), SAMPLE);
    }
}
