//! Extraction of [`LocationPoint`]s from a timeline export document.
//!
//! The container is either a bare JSON list of records or a wrapper object
//! exposing the list under `timelineObjects` (current exports) or
//! `locations` (the oldest dialect). Each record is classified via
//! [`TimelineRecord::classify`] and its coordinates extracted; points
//! outside the requested [`DateRange`] are discarded. Output is sorted
//! ascending by timestamp regardless of input order — record types are not
//! interleaved chronologically in real exports.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use travel_map_timeline_models::{CancelToken, DateRange, LocationPoint, ParseStats};

use crate::TimelineError;
use crate::record::{RawNumber, RawRecord, TimelineRecord, parse_geo_string};

/// Record-level screening thresholds applied while parsing.
///
/// These mirror the reduction the original parser applies before analysis:
/// trivially short activities and low-confidence or momentary visits carry
/// no signal and only inflate the geocoding workload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilters {
    /// Activities that traveled less than this many meters are dropped.
    pub min_activity_distance_meters: f64,
    /// Visits shorter than this many seconds are dropped.
    pub min_visit_duration_secs: f64,
    /// Visits below this confidence are dropped.
    pub min_visit_probability: f64,
}

impl Default for RecordFilters {
    fn default() -> Self {
        Self {
            min_activity_distance_meters: 200.0,
            min_visit_duration_secs: 600.0,
            min_visit_probability: 0.1,
        }
    }
}

impl RecordFilters {
    /// Thresholds that keep every structurally valid record.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            min_activity_distance_meters: 0.0,
            min_visit_duration_secs: 0.0,
            min_visit_probability: 0.0,
        }
    }
}

/// The result of parsing one export document.
#[derive(Debug, Clone)]
pub struct ParsedTimeline {
    /// Extracted points, sorted ascending by timestamp.
    pub points: Vec<LocationPoint>,
    /// Per-shape record counts for diagnostics.
    pub stats: ParseStats,
}

/// Parses a timeline export file from disk.
///
/// # Errors
///
/// Returns [`TimelineError`] if the file cannot be read, is not valid JSON,
/// has an unrecognized top-level shape, or the run is canceled.
pub fn parse_file(
    path: &Path,
    range: &DateRange,
    filters: &RecordFilters,
    cancel: &CancelToken,
) -> Result<ParsedTimeline, TimelineError> {
    let bytes = std::fs::read(path)?;
    parse_slice(&bytes, range, filters, cancel)
}

/// Parses a timeline export document from memory.
///
/// # Errors
///
/// Returns [`TimelineError`] if the input is not valid JSON, has an
/// unrecognized top-level shape, or the run is canceled.
pub fn parse_slice(
    bytes: &[u8],
    range: &DateRange,
    filters: &RecordFilters,
    cancel: &CancelToken,
) -> Result<ParsedTimeline, TimelineError> {
    let document: serde_json::Value = serde_json::from_slice(bytes)?;
    let records = container_records(document)?;

    let mut stats = ParseStats {
        total_records: records.len() as u64,
        ..ParseStats::default()
    };
    let mut points = Vec::new();

    for value in records {
        if cancel.is_canceled() {
            return Err(TimelineError::Canceled);
        }

        let Ok(raw) = serde_json::from_value::<RawRecord>(value) else {
            stats.unrecognized += 1;
            continue;
        };

        match TimelineRecord::classify(raw) {
            TimelineRecord::Activity(raw) => {
                emit_activity(&raw, range, filters, &mut stats, &mut points);
            }
            TimelineRecord::Visit(raw) => {
                emit_visit(&raw, range, filters, &mut stats, &mut points);
            }
            TimelineRecord::Path(raw) => emit_path(&raw, range, &mut stats, &mut points),
            TimelineRecord::LegacyPoint(raw) => {
                emit_legacy(&raw, range, &mut stats, &mut points);
            }
            TimelineRecord::Unrecognized => stats.unrecognized += 1,
        }
    }

    points.sort_by_key(|p| p.timestamp);

    log::debug!(
        "Parsed {} points from {} records ({} activities, {} visits, {} paths, \
         {} legacy, {} unrecognized, {} screened out, {} invalid)",
        points.len(),
        stats.total_records,
        stats.activities,
        stats.visits,
        stats.paths,
        stats.legacy_points,
        stats.unrecognized,
        stats.screened_out,
        stats.dropped_invalid,
    );

    Ok(ParsedTimeline { points, stats })
}

/// Extracts the record list from the top-level JSON value.
fn container_records(document: serde_json::Value) -> Result<Vec<serde_json::Value>, TimelineError> {
    match document {
        serde_json::Value::Array(records) => Ok(records),
        serde_json::Value::Object(mut map) => {
            let wrapped = map.remove("timelineObjects").or_else(|| map.remove("locations"));
            match wrapped {
                Some(serde_json::Value::Array(records)) => Ok(records),
                _ => Err(TimelineError::UnsupportedContainer),
            }
        }
        _ => Err(TimelineError::UnsupportedContainer),
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Converts a legacy epoch value to UTC, disambiguating milliseconds from
/// seconds by digit count (13 vs 10).
#[allow(clippy::cast_possible_truncation)]
fn epoch_to_utc(value: f64) -> Option<DateTime<Utc>> {
    let n = value as i64;
    match n.unsigned_abs().to_string().len() {
        13 => DateTime::from_timestamp_millis(n),
        10 => DateTime::from_timestamp(n, 0),
        _ => None,
    }
}

fn emit_activity(
    raw: &RawRecord,
    range: &DateRange,
    filters: &RecordFilters,
    stats: &mut ParseStats,
    out: &mut Vec<LocationPoint>,
) {
    let Some(activity) = raw.activity.as_ref() else {
        return;
    };

    // Missing distanceMeters counts as zero traveled.
    let distance_m = activity
        .distance_meters
        .as_ref()
        .and_then(RawNumber::as_f64)
        .unwrap_or(0.0);
    if distance_m < filters.min_activity_distance_meters {
        stats.screened_out += 1;
        return;
    }
    stats.activities += 1;

    let raw_mode = activity
        .top_candidate
        .as_ref()
        .and_then(|candidate| candidate.kind.as_deref())
        .map(str::to_lowercase);

    let endpoints = [
        (activity.start.as_deref(), raw.start_time.as_deref()),
        (activity.end.as_deref(), raw.end_time.as_deref()),
    ];
    for (geo, time) in endpoints {
        let (Some(geo), Some(time)) = (geo, time) else {
            continue;
        };
        match (parse_geo_string(geo), parse_rfc3339(time)) {
            (Some((lat, lon)), Some(timestamp)) => {
                if range.contains(&timestamp) {
                    out.push(LocationPoint {
                        timestamp,
                        latitude: lat,
                        longitude: lon,
                        raw_mode: raw_mode.clone(),
                    });
                }
            }
            _ => stats.dropped_invalid += 1,
        }
    }
}

fn emit_visit(
    raw: &RawRecord,
    range: &DateRange,
    filters: &RecordFilters,
    stats: &mut ParseStats,
    out: &mut Vec<LocationPoint>,
) {
    let Some(visit) = raw.visit.as_ref() else {
        return;
    };

    if filters.min_visit_duration_secs > 0.0 {
        let bounds = (
            raw.start_time.as_deref().and_then(parse_rfc3339),
            raw.end_time.as_deref().and_then(parse_rfc3339),
        );
        if let (Some(start), Some(end)) = bounds {
            #[allow(clippy::cast_precision_loss)]
            let duration_secs = (end - start).num_seconds() as f64;
            if duration_secs < filters.min_visit_duration_secs {
                stats.screened_out += 1;
                return;
            }
        }
    }

    // Missing probability counts as zero confidence.
    let probability = visit
        .probability
        .as_ref()
        .and_then(RawNumber::as_f64)
        .unwrap_or(0.0);
    if probability < filters.min_visit_probability {
        stats.screened_out += 1;
        return;
    }
    stats.visits += 1;

    let geo = visit
        .top_candidate
        .as_ref()
        .and_then(|candidate| candidate.place_location.as_deref());
    let (Some(geo), Some(time)) = (geo, raw.start_time.as_deref()) else {
        return;
    };

    match (parse_geo_string(geo), parse_rfc3339(time)) {
        (Some((lat, lon)), Some(timestamp)) => {
            if range.contains(&timestamp) {
                out.push(LocationPoint::new(timestamp, lat, lon));
            }
        }
        _ => stats.dropped_invalid += 1,
    }
}

fn emit_path(
    raw: &RawRecord,
    range: &DateRange,
    stats: &mut ParseStats,
    out: &mut Vec<LocationPoint>,
) {
    let Some(waypoints) = raw.timeline_path.as_ref() else {
        return;
    };
    stats.paths += 1;

    let Some(time) = raw.start_time.as_deref() else {
        return;
    };
    let Some(start) = parse_rfc3339(time) else {
        stats.dropped_invalid += 1;
        return;
    };
    if !range.contains(&start) {
        return;
    }

    for waypoint in waypoints {
        let Some(geo) = waypoint.point.as_deref() else {
            continue;
        };
        let Some((lat, lon)) = parse_geo_string(geo) else {
            stats.dropped_invalid += 1;
            continue;
        };

        let offset_minutes = waypoint
            .duration_minutes_offset_from_start_time
            .as_ref()
            .and_then(RawNumber::as_f64)
            .unwrap_or(0.0);
        #[allow(clippy::cast_possible_truncation)]
        let timestamp = start + Duration::seconds((offset_minutes * 60.0).round() as i64);

        if range.contains(&timestamp) {
            out.push(LocationPoint {
                timestamp,
                latitude: lat,
                longitude: lon,
                raw_mode: waypoint.mode.as_deref().map(str::to_lowercase),
            });
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn emit_legacy(
    raw: &RawRecord,
    range: &DateRange,
    stats: &mut ParseStats,
    out: &mut Vec<LocationPoint>,
) {
    stats.legacy_points += 1;

    let Some(timestamp) = raw
        .timestamp_ms
        .as_ref()
        .and_then(RawNumber::as_f64)
        .and_then(epoch_to_utc)
    else {
        stats.dropped_invalid += 1;
        return;
    };

    let coordinate = if let (Some(lat_e7), Some(lon_e7)) = (raw.latitude_e7, raw.longitude_e7) {
        Some((lat_e7 as f64 / 1e7, lon_e7 as f64 / 1e7))
    } else if let (Some(lat), Some(lon)) = (raw.latitude, raw.longitude) {
        Some((lat, lon))
    } else {
        None
    };

    let Some((lat, lon)) = coordinate.filter(|(lat, lon)| lat.abs() <= 90.0 && lon.abs() <= 180.0)
    else {
        stats.dropped_invalid += 1;
        return;
    };

    if range.contains(&timestamp) {
        out.push(LocationPoint::new(timestamp, lat, lon));
    }
}
