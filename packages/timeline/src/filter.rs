//! Point-stream reduction before geocoding.
//!
//! Two sequential, order-preserving passes shrink the stream so the
//! expensive place resolution only sees points that matter:
//!
//! - [`dedup_coordinate_buckets`] collapses bursty duplicates (identical
//!   rounded coordinate in the same 10-minute bucket), keeping the first
//!   occurrence. Runs before the threshold filter when enabled.
//! - [`filter_significant`] keeps a point only when it moved far enough or
//!   long enough since the last *kept* point.
//!
//! Both are O(n), stable, and never drop the first point.

use std::collections::HashSet;

use travel_map_timeline_models::LocationPoint;

/// Seconds per coordinate-bucket time slot.
const BUCKET_SECONDS: i64 = 600;

/// Distance/time thresholds for the significance filter.
///
/// The source history carried two competing pairs for the same purpose; the
/// canonical default is an explicit choice here rather than a guess —
/// [`FilterConfig::STANDARD`] unless the caller opts into
/// [`FilterConfig::STRICT`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    /// Keep a point once it is at least this far from the last kept point.
    pub min_distance_miles: f64,
    /// Keep a point once at least this much time has elapsed since the last
    /// kept point.
    pub min_time_hours: f64,
}

impl FilterConfig {
    /// Default reduction: half a mile or half an hour.
    pub const STANDARD: Self = Self {
        min_distance_miles: 0.5,
        min_time_hours: 0.5,
    };

    /// Aggressive variant (200 m / 10 min) for dense path data.
    pub const STRICT: Self = Self {
        min_distance_miles: 0.124_274,
        min_time_hours: 600.0 / 3600.0,
    };
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Keeps only points that represent a significant change from the last kept
/// point, by distance or elapsed time. The first point is always kept.
#[must_use]
pub fn filter_significant(points: &[LocationPoint], config: &FilterConfig) -> Vec<LocationPoint> {
    let Some(first) = points.first() else {
        return Vec::new();
    };

    let mut kept = vec![first.clone()];
    let mut last = first;

    for point in &points[1..] {
        let distance = travel_map_spatial::haversine_miles(last.coordinate(), point.coordinate());
        #[allow(clippy::cast_precision_loss)]
        let hours = (point.timestamp - last.timestamp).num_seconds() as f64 / 3600.0;

        if distance > config.min_distance_miles || hours > config.min_time_hours {
            kept.push(point.clone());
            last = point;
        }
    }

    kept
}

/// Collapses points sharing a 5-decimal rounded coordinate and a 10-minute
/// time bucket, keeping the first occurrence of each bucket.
#[must_use]
pub fn dedup_coordinate_buckets(points: &[LocationPoint]) -> Vec<LocationPoint> {
    let mut seen: HashSet<(i64, i64, i64)> = HashSet::new();
    let mut kept = Vec::new();

    for point in points {
        if seen.insert(bucket_key(point)) {
            kept.push(point.clone());
        }
    }

    kept
}

#[allow(clippy::cast_possible_truncation)]
fn bucket_key(point: &LocationPoint) -> (i64, i64, i64) {
    (
        (point.latitude * 1e5).round() as i64,
        (point.longitude * 1e5).round() as i64,
        point.timestamp.timestamp().div_euclid(BUCKET_SECONDS),
    )
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _, Utc};

    use super::*;

    fn point(minutes: i64, lat: f64, lon: f64) -> LocationPoint {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        LocationPoint::new(base + Duration::minutes(minutes), lat, lon)
    }

    #[test]
    fn first_point_is_always_kept() {
        let points = vec![point(0, 48.8566, 2.3522)];
        let kept = filter_significant(&points, &FilterConfig::STANDARD);
        assert_eq!(kept, points);
    }

    #[test]
    fn nearby_quick_successor_is_collapsed() {
        // 0.05 mi apart, 2 minutes apart: under both thresholds.
        let points = vec![point(0, 48.8566, 2.3522), point(2, 48.857_32, 2.3522)];
        let kept = filter_significant(&points, &FilterConfig::STANDARD);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0], points[0]);
    }

    #[test]
    fn distance_alone_keeps_a_point() {
        // ~0.7 mi north after one minute.
        let points = vec![point(0, 48.8566, 2.3522), point(1, 48.8667, 2.3522)];
        let kept = filter_significant(&points, &FilterConfig::STANDARD);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn elapsed_time_alone_keeps_a_point() {
        let points = vec![point(0, 48.8566, 2.3522), point(45, 48.8566, 2.3522)];
        let kept = filter_significant(&points, &FilterConfig::STANDARD);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn decisions_compare_against_last_kept_point() {
        // Three crawling points each ~0.3 mi apart: the second is dropped,
        // but drift accumulates past the threshold by the third.
        let points = vec![
            point(0, 48.8566, 2.3522),
            point(5, 48.8610, 2.3522),
            point(10, 48.8654, 2.3522),
        ];
        let kept = filter_significant(&points, &FilterConfig::STANDARD);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1], points[2]);
    }

    #[test]
    fn strict_preset_keeps_more_points() {
        // 0.2 mi apart: below standard, above strict.
        let points = vec![point(0, 48.8566, 2.3522), point(2, 48.859_5, 2.3522)];
        assert_eq!(filter_significant(&points, &FilterConfig::STANDARD).len(), 1);
        assert_eq!(filter_significant(&points, &FilterConfig::STRICT).len(), 2);
    }

    #[test]
    fn filter_preserves_order() {
        let points: Vec<LocationPoint> = (0..10)
            .map(|i| point(i64::from(i) * 60, 48.0 + f64::from(i) * 0.1, 2.3522))
            .collect();
        let kept = filter_significant(&points, &FilterConfig::STANDARD);
        assert_eq!(kept, points);
    }

    #[test]
    fn bucket_dedup_collapses_same_bucket_only() {
        let points = vec![
            point(0, 48.8566, 2.3522),
            // same rounded coordinate, same 10-minute bucket
            point(3, 48.8566, 2.3522),
            // same coordinate, later bucket
            point(20, 48.8566, 2.3522),
            // different coordinate, first bucket
            point(4, 48.9000, 2.3522),
        ];
        let kept = dedup_coordinate_buckets(&points);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0], points[0]);
        assert_eq!(kept[1], points[2]);
        assert_eq!(kept[2], points[3]);
    }
}
