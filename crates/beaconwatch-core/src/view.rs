//! What the presentation layer shows for the tracked set.
//!
//! Rendering is a pure function of a [`TrackedSnapshot`]: one [`BeaconRow`]
//! per record plus the monitoring toggle label.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::beacon::{identifier_label, BeaconRecord, RegionState};
use crate::coordinator::TrackedSnapshot;

/// Information text before the first observation.
pub const PLACEHOLDER_INFORMATION: &str = "Beacon status";

/// Toggle label while monitoring is off.
pub const SEARCH_LABEL: &str = "search";

/// Toggle label while monitoring is on.
pub const PAUSE_LABEL: &str = "pause";

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "identifier": "E2C56DB5-DFFB-48D2-B060-D0F5A71096E0",
    "information": "Proximity: Near\nEstimated distance: 1.50 m\nRSSI: -60",
    "state_information": "Inside region",
    "region_state": "inside",
    "highlighted": true
}))]
pub struct BeaconRow {
    /// Beacon identifier, upper-case hyphenated.
    #[schema(example = "E2C56DB5-DFFB-48D2-B060-D0F5A71096E0")]
    pub identifier: String,

    /// Observation summary.
    pub information: String,

    /// Region membership text.
    #[schema(example = "Inside region")]
    pub state_information: String,

    /// Region membership.
    pub region_state: RegionState,

    /// Whether the row background is highlighted.
    #[schema(example = true)]
    pub highlighted: bool,
}

impl BeaconRow {
    /// Render one record.
    #[must_use]
    pub fn from_record(record: &BeaconRecord) -> Self {
        let information = record.observation.map_or_else(
            || PLACEHOLDER_INFORMATION.to_string(),
            |o| {
                format!(
                    "Proximity: {}\nEstimated distance: {:.2} m\nRSSI: {}",
                    o.proximity.label(),
                    o.accuracy_m,
                    o.rssi
                )
            },
        );

        Self {
            identifier: identifier_label(&record.identifier),
            information,
            state_information: region_text(record.region_state).to_string(),
            region_state: record.region_state,
            highlighted: record.highlighted,
        }
    }
}

/// The whole screen: rows and the toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BeaconListView {
    /// Snapshot revision this view was rendered from.
    #[schema(example = 7)]
    pub revision: u64,

    /// Whether monitoring is active.
    #[schema(example = true)]
    pub monitoring: bool,

    /// Label of the monitoring toggle.
    #[schema(example = "pause")]
    pub toggle_label: String,

    /// Rows in insertion order.
    pub beacons: Vec<BeaconRow>,
}

impl BeaconListView {
    /// Render a snapshot.
    #[must_use]
    pub fn render(snapshot: &TrackedSnapshot) -> Self {
        Self {
            revision: snapshot.revision,
            monitoring: snapshot.is_monitoring,
            toggle_label: toggle_label(snapshot.is_monitoring).to_string(),
            beacons: snapshot.beacons.iter().map(BeaconRow::from_record).collect(),
        }
    }
}

/// Label for the monitoring toggle.
#[must_use]
pub const fn toggle_label(is_monitoring: bool) -> &'static str {
    if is_monitoring {
        PAUSE_LABEL
    } else {
        SEARCH_LABEL
    }
}

/// Text shown for a region state.
#[must_use]
pub const fn region_text(state: RegionState) -> &'static str {
    match state {
        RegionState::Unknown => "In region?",
        RegionState::Inside => "Inside region",
        RegionState::Outside => "Left region",
    }
}
