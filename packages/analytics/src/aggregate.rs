//! Single-pass travel aggregation over the geocoded point stream.
//!
//! For every adjacent pair of points the elapsed time is attributed to the
//! *earlier* point's place (both ledgers in one pass), the pair distance
//! accumulates into the total once it clears the movement-noise threshold,
//! and a place transition far enough apart emits a classified
//! [`LocationJump`]. The stream must already be chronologically sorted —
//! the parser guarantees it.

use std::collections::BTreeSet;

use thiserror::Error;
use travel_map_analytics_models::{Aggregation, GroupBy, LocationJump};
use travel_map_geocoder::GeocodeResult;
use travel_map_timeline_models::{CancelToken, LocationPoint};

use crate::mode::{JumpContext, WaterProbe, classify};

/// Pair distances below this are GPS jitter and do not count toward the
/// total distance traveled.
pub const MOVEMENT_THRESHOLD_MILES: f64 = 0.1;

/// Whether a repeated `(from, to)` place pair records another jump.
///
/// The source suppressed repeats for the whole run, silently dropping
/// legitimate round-trips; recording every transition is the default here
/// and the old behavior remains selectable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JumpDedupPolicy {
    /// Record every place transition.
    #[default]
    AllTransitions,
    /// Record each `(from, to)` pair once per run.
    UniquePairs,
}

/// Aggregation settings for one run.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Grouping used for jump labels.
    pub group_by: GroupBy,
    /// Minimum distance for a place transition to count as a jump.
    pub min_jump_miles: f64,
    /// Repeated-pair policy.
    pub jump_dedup: JumpDedupPolicy,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            group_by: GroupBy::ByCity,
            min_jump_miles: 10.0,
            jump_dedup: JumpDedupPolicy::default(),
        }
    }
}

/// A point paired with its resolved place.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPoint {
    /// The filtered timeline point.
    pub point: LocationPoint,
    /// Its place resolution (possibly a placeholder).
    pub place: GeocodeResult,
}

/// Errors from aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The run was canceled mid-pass.
    #[error("aggregation canceled")]
    Canceled,
}

/// Walks the geocoded stream once, producing ledgers, jumps, and totals.
///
/// # Errors
///
/// Returns [`AggregateError::Canceled`] if the run is canceled; no other
/// failure exists — unresolved places were already degraded to
/// placeholders upstream.
pub async fn aggregate(
    points: &[GeocodedPoint],
    config: &AggregateConfig,
    water: &dyn WaterProbe,
    cancel: &CancelToken,
) -> Result<Aggregation, AggregateError> {
    let mut aggregation = Aggregation::default();
    let mut seen_pairs: BTreeSet<(String, String)> = BTreeSet::new();

    for pair in points.windows(2) {
        if cancel.is_canceled() {
            return Err(AggregateError::Canceled);
        }
        let (prev, current) = (&pair[0], &pair[1]);

        #[allow(clippy::cast_precision_loss)]
        let elapsed_secs = (current.point.timestamp - prev.point.timestamp).num_seconds() as f64;
        let days = elapsed_secs / 86_400.0;
        *aggregation
            .city_days
            .entry(city_label(&prev.place))
            .or_insert(0.0) += days;
        *aggregation
            .region_days
            .entry(region_label(&prev.place))
            .or_insert(0.0) += days;

        let distance = travel_map_spatial::haversine_miles(
            prev.point.coordinate(),
            current.point.coordinate(),
        );
        if distance > MOVEMENT_THRESHOLD_MILES {
            aggregation.total_distance_miles += distance;
        }

        let from_label = place_label(&prev.place, config.group_by);
        let to_label = place_label(&current.place, config.group_by);
        if from_label == to_label || distance <= config.min_jump_miles {
            continue;
        }

        if config.jump_dedup == JumpDedupPolicy::UniquePairs
            && !seen_pairs.insert((from_label.clone(), to_label.clone()))
        {
            log::debug!("Suppressing repeated jump {from_label} -> {to_label}");
            continue;
        }

        let duration_hours = elapsed_secs / 3600.0;
        let context = JumpContext {
            from: prev.point.coordinate(),
            to: current.point.coordinate(),
            from_country: prev.place.country.as_deref(),
            to_country: current.place.country.as_deref(),
            to_place_name: &current.place.place_name,
            raw_mode: current.point.raw_mode.as_deref(),
            distance_miles: distance,
            duration_hours,
        };
        let mode = classify(&context, water).await;
        log::info!(
            "Jump: {from_label} -> {to_label}, mode={mode}, {distance:.2} mi in {duration_hours:.2} h"
        );

        aggregation.jumps.push(LocationJump {
            from_place: from_label,
            to_place: to_label,
            distance_miles: distance,
            duration_hours,
            timestamp: prev.point.timestamp,
            mode,
        });
    }

    Ok(aggregation)
}

/// City-level label, e.g. `"Paris, France"` or `"Chicago, Illinois, USA"`.
fn city_label(place: &GeocodeResult) -> String {
    let city = non_empty(place.city.as_deref()).unwrap_or("Unknown");
    let country = non_empty(place.country.as_deref()).unwrap_or("Unknown");

    if country == "United States" {
        let state = non_empty(place.state.as_deref()).unwrap_or("Unknown");
        format!("{city}, {state}, USA")
    } else if city == "Unknown" && country != "Unknown" {
        country.to_string()
    } else {
        format!("{city}, {country}")
    }
}

/// Region-level label: US state inside the United States, country
/// elsewhere.
fn region_label(place: &GeocodeResult) -> String {
    if place.country.as_deref() == Some("United States") {
        non_empty(place.state.as_deref())
            .unwrap_or("Unknown US State")
            .to_string()
    } else {
        non_empty(place.country.as_deref())
            .unwrap_or("Unknown")
            .to_string()
    }
}

fn place_label(place: &GeocodeResult, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::ByCity => city_label(place),
        GroupBy::ByState => region_label(place),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone as _, Utc};
    use travel_map_analytics_models::TransportMode;

    use super::*;

    struct Land;

    #[async_trait]
    impl WaterProbe for Land {
        async fn is_over_water(&self, _: (f64, f64), _: (f64, f64), _: f64, _: &str) -> bool {
            false
        }
    }

    fn place(city: &str, state: Option<&str>, country: &str) -> GeocodeResult {
        GeocodeResult {
            city: Some(city.to_string()),
            state: state.map(String::from),
            country: Some(country.to_string()),
            place_name: city.to_lowercase(),
            is_water: false,
        }
    }

    fn geocoded(hours: i64, lat: f64, lon: f64, result: GeocodeResult) -> GeocodedPoint {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        GeocodedPoint {
            point: LocationPoint::new(base + Duration::hours(hours), lat, lon),
            place: result,
        }
    }

    fn paris() -> GeocodeResult {
        place("Paris", None, "France")
    }

    fn tokyo() -> GeocodeResult {
        place("Tokyo", None, "Japan")
    }

    #[tokio::test]
    async fn time_accrues_to_the_earlier_points_place() {
        let points = vec![
            geocoded(0, 48.8566, 2.3522, paris()),
            geocoded(12, 48.8566, 2.3522, paris()),
            geocoded(24, 35.6762, 139.6503, tokyo()),
        ];

        let aggregation = aggregate(
            &points,
            &AggregateConfig::default(),
            &Land,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        // Both gaps (12 h each) belong to Paris; Tokyo has accrued nothing.
        let paris_days = aggregation.city_days["Paris, France"];
        assert!((paris_days - 1.0).abs() < 1e-9);
        assert!(!aggregation.city_days.contains_key("Tokyo, Japan"));

        let france_days = aggregation.region_days["France"];
        assert!((france_days - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn place_change_beyond_threshold_emits_classified_jump() {
        let points = vec![
            geocoded(0, 48.8566, 2.3522, paris()),
            geocoded(14, 35.6762, 139.6503, tokyo()),
        ];

        let aggregation = aggregate(
            &points,
            &AggregateConfig::default(),
            &Land,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(aggregation.jumps.len(), 1);
        let jump = &aggregation.jumps[0];
        assert_eq!(jump.from_place, "Paris, France");
        assert_eq!(jump.to_place, "Tokyo, Japan");
        assert_eq!(jump.mode, TransportMode::Flight);
        assert!((jump.duration_hours - 14.0).abs() < 1e-9);
        assert_eq!(jump.timestamp, points[0].point.timestamp);
        assert!(jump.distance_miles > 5_000.0);
    }

    #[tokio::test]
    async fn short_place_change_accrues_time_but_no_jump() {
        // Adjacent arrondissements a mile apart.
        let points = vec![
            geocoded(0, 48.8566, 2.3522, place("Paris", None, "France")),
            geocoded(1, 48.8700, 2.3600, place("Montreuil", None, "France")),
        ];

        let aggregation = aggregate(
            &points,
            &AggregateConfig::default(),
            &Land,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert!(aggregation.jumps.is_empty());
        assert!(aggregation.city_days.contains_key("Paris, France"));
        // Still counted toward total distance (above the noise threshold).
        assert!(aggregation.total_distance_miles > 0.5);
    }

    #[tokio::test]
    async fn jitter_does_not_accumulate_distance() {
        let points = vec![
            geocoded(0, 48.8566, 2.3522, paris()),
            geocoded(1, 48.856_65, 2.3522, paris()),
        ];

        let aggregation = aggregate(
            &points,
            &AggregateConfig::default(),
            &Land,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert!(aggregation.total_distance_miles.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unique_pairs_policy_suppresses_round_trip_repeats() {
        let commute = vec![
            geocoded(0, 48.8566, 2.3522, paris()),
            geocoded(14, 35.6762, 139.6503, tokyo()),
            geocoded(28, 48.8566, 2.3522, paris()),
            geocoded(42, 35.6762, 139.6503, tokyo()),
        ];

        let all = aggregate(
            &commute,
            &AggregateConfig::default(),
            &Land,
            &CancelToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(all.jumps.len(), 3);

        let deduped = aggregate(
            &commute,
            &AggregateConfig {
                jump_dedup: JumpDedupPolicy::UniquePairs,
                ..AggregateConfig::default()
            },
            &Land,
            &CancelToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(deduped.jumps.len(), 2);
        assert_eq!(deduped.jumps[0].to_place, "Tokyo, Japan");
        assert_eq!(deduped.jumps[1].to_place, "Paris, France");
    }

    #[tokio::test]
    async fn by_state_grouping_labels_us_places_by_state() {
        let points = vec![
            geocoded(0, 41.8781, -87.6298, place("Chicago", Some("Illinois"), "United States")),
            geocoded(10, 44.9778, -93.2650, place("Minneapolis", Some("Minnesota"), "United States")),
        ];

        let aggregation = aggregate(
            &points,
            &AggregateConfig {
                group_by: GroupBy::ByState,
                ..AggregateConfig::default()
            },
            &Land,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert!(aggregation.region_days.contains_key("Illinois"));
        assert_eq!(aggregation.jumps[0].from_place, "Illinois");
        assert_eq!(aggregation.jumps[0].to_place, "Minnesota");
    }

    #[tokio::test]
    async fn cancellation_stops_the_pass() {
        let points = vec![
            geocoded(0, 48.8566, 2.3522, paris()),
            geocoded(14, 35.6762, 139.6503, tokyo()),
        ];
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = aggregate(&points, &AggregateConfig::default(), &Land, &cancel).await;
        assert!(matches!(result, Err(AggregateError::Canceled)));
    }
}
