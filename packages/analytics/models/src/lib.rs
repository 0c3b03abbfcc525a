#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Transport mode taxonomy and travel aggregation result types.
//!
//! The canonical mode vocabulary every jump is classified into, plus the
//! value types the aggregator produces: place-time ledgers and the
//! chronological jump list. Classification logic lives in
//! `travel_map_analytics`; these are pure data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Final transport mode assigned to a jump.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum TransportMode {
    /// Rail travel, including subway and tram.
    Train,
    /// Road travel in a passenger vehicle.
    Car,
    /// On foot.
    Walking,
    /// Scheduled water crossing.
    Ferry,
    /// Air travel.
    Flight,
    /// Small-craft water travel.
    Boat,
    /// No confident classification.
    Unknown,
}

impl TransportMode {
    /// Modes the source labels are trusted for — the classifier keeps them
    /// without applying override rules.
    #[must_use]
    pub const fn is_trusted(self) -> bool {
        matches!(self, Self::Flight | Self::Train | Self::Ferry | Self::Walking)
    }
}

/// How places are grouped for the time ledger and jump labels.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupBy {
    /// Group by city (e.g. `"Paris, France"`).
    #[default]
    ByCity,
    /// Group by US state or country.
    ByState,
}

/// A significant movement between two resolved places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationJump {
    /// Label of the place departed from.
    pub from_place: String,
    /// Label of the place arrived at.
    pub to_place: String,
    /// Great-circle distance between the endpoints.
    pub distance_miles: f64,
    /// Elapsed time between the endpoints.
    pub duration_hours: f64,
    /// Departure instant (the earlier point's timestamp).
    pub timestamp: DateTime<Utc>,
    /// Classified transport mode.
    pub mode: TransportMode,
}

/// Accumulated fractional days per place label.
pub type PlaceLedger = BTreeMap<String, f64>;

/// Everything one aggregation pass produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    /// Fractional days per city label.
    pub city_days: PlaceLedger,
    /// Fractional days per US-state/country label.
    pub region_days: PlaceLedger,
    /// Chronological jump list.
    pub jumps: Vec<LocationJump>,
    /// Total distance across all point pairs that moved more than the
    /// noise threshold, whether or not a jump was recorded.
    pub total_distance_miles: f64,
}

/// Ledger entries sorted descending by days, then ascending by name.
#[must_use]
pub fn ranked_places(ledger: &PlaceLedger) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = ledger
        .iter()
        .map(|(place, days)| (place.as_str(), *days))
        .collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    entries
}
