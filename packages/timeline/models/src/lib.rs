#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core value types for the travel map pipeline.
//!
//! These types flow through every stage: the parser produces
//! [`LocationPoint`]s, the significance filter reduces them, the geocoder
//! resolves them, and the aggregator consumes them. They are deliberately
//! free of any parsing or I/O logic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped GPS coordinate extracted from a timeline export.
///
/// Cache identity is by *rounded* coordinate, not by value — two points a few
/// centimeters apart resolve to the same place. `raw_mode` is the activity
/// label the export attached to the point (e.g. `"in passenger vehicle"`),
/// lowercased; it is a best-effort annotation and frequently absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    /// Instant the point was recorded, normalized to UTC.
    pub timestamp: DateTime<Utc>,
    /// Latitude in decimal degrees (WGS84), |lat| <= 90.
    pub latitude: f64,
    /// Longitude in decimal degrees (WGS84), |lon| <= 180.
    pub longitude: f64,
    /// Lowercased activity label from the source record, if any.
    pub raw_mode: Option<String>,
}

impl LocationPoint {
    /// Creates a point without a mode annotation.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            raw_mode: None,
        }
    }

    /// The `(latitude, longitude)` pair.
    #[must_use]
    pub const fn coordinate(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// An inclusive calendar date range used to bound an analysis run.
///
/// The end bound covers the *entire* end day: a point at 23:59 on `end` is in
/// range. Comparisons are made on the UTC calendar date of the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range (inclusive).
    pub start: NaiveDate,
    /// Last day of the range (inclusive of the whole day).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range. `start` and `end` may be equal for a single day.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Returns `true` if the instant's UTC date falls within the range.
    #[must_use]
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        let date = instant.date_naive();
        date >= self.start && date <= self.end
    }
}

/// Per-shape record counts collected while parsing a timeline file.
///
/// Exposed for diagnostics and the final summary artifact; the parser itself
/// never fails on unrecognized or malformed records, it counts them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Total records inspected in the container.
    pub total_records: u64,
    /// Records classified as activity segments.
    pub activities: u64,
    /// Records classified as place visits.
    pub visits: u64,
    /// Records classified as timeline paths.
    pub paths: u64,
    /// Records classified as legacy flat points.
    pub legacy_points: u64,
    /// Records matching none of the known shapes.
    pub unrecognized: u64,
    /// Records dropped by the record-level screening thresholds.
    pub screened_out: u64,
    /// Candidate points dropped for malformed or out-of-range coordinates
    /// or unparseable timestamps.
    pub dropped_invalid: u64,
}

/// Cooperative cancellation flag shared between a pipeline run and its
/// controller.
///
/// Long-running loops poll [`CancelToken::is_canceled`] at iteration
/// boundaries (between records, before each geocoding batch, per aggregation
/// step) — never mid-record, so a canceled run stops at a deterministic
/// point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-canceled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`CancelToken::cancel`] has been called on any
    /// clone of this token.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_includes_entire_end_day() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));
        let late = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        assert!(range.contains(&late));

        let next_day = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert!(!range.contains(&next_day));
    }

    #[test]
    fn date_range_excludes_before_start() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31));
        let before = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert!(!range.contains(&before));
    }

    #[test]
    fn cancel_token_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_canceled());
        token.cancel();
        assert!(clone.is_canceled());
    }
}
