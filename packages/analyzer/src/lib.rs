#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end orchestration of one analysis run.
//!
//! [`run`] drives the full pipeline: parse the export, reduce the point
//! stream, resolve places through the cached geocoder, aggregate time and
//! jumps, and write the report artifacts. Only two conditions fail a run —
//! an unusable input container and an empty in-range point set. Everything
//! recoverable (lookup failures, cache I/O) was already absorbed by the
//! components and surfaces in the final statistics disclosure instead.
//!
//! Cancellation is a third, non-error outcome: the token is polled at
//! stage boundaries (and inside each stage's loops), and a canceled run
//! returns [`RunOutcome::Canceled`] without writing any artifact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use travel_map_analytics::{
    AggregateConfig, AggregateError, GeocodedPoint, JumpDedupPolicy, aggregate,
};
use travel_map_analytics_models::{GroupBy, TransportMode};
use travel_map_geocoder::{
    GeoCache, GeocodeClient, GeocodeError, GeocodeResult, GeocoderConfig, StatsSnapshot,
};
use travel_map_report::{ReportError, ReportMeta, ReportPaths, mode_distribution, write_reports};
use travel_map_timeline::{
    FilterConfig, RecordFilters, TimelineError, dedup_coordinate_buckets, filter_significant,
    parse_file,
};
use travel_map_timeline_models::{CancelToken, DateRange, LocationPoint, ParseStats};

/// Everything a run needs, supplied by the CLI (or any other front end).
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Inclusive date range to analyze.
    pub range: DateRange,
    /// Grouping for jump labels.
    pub group_by: GroupBy,
    /// Significance filter thresholds.
    pub filter: FilterConfig,
    /// Run the coordinate-bucket dedup pass before the threshold filter.
    pub bucket_dedup: bool,
    /// Record-level screening thresholds.
    pub record_filters: RecordFilters,
    /// Geocoding provider settings.
    pub geocoder: GeocoderConfig,
    /// Persistent geocode cache file.
    pub cache_path: PathBuf,
    /// Directory the report artifacts are written into.
    pub output_dir: PathBuf,
    /// Minimum distance for a place transition to count as a jump.
    pub min_jump_miles: f64,
    /// Repeated jump-pair policy.
    pub jump_dedup: JumpDedupPolicy,
}

/// Errors that fail a whole run.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The input could not be read or has an unusable shape.
    #[error("input error: {0}")]
    Timeline(#[from] TimelineError),

    /// Parsing succeeded but no point fell inside the date range.
    #[error("no location data between {start} and {end}")]
    NoPointsInRange {
        /// Start of the requested range.
        start: NaiveDate,
        /// End of the requested range.
        end: NaiveDate,
    },

    /// Geocoding infrastructure failure (not per-coordinate lookups, which
    /// degrade to placeholders).
    #[error("geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    /// A report artifact could not be written.
    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run finished and wrote its artifacts.
    Completed(Box<RunReport>),
    /// The run was canceled; nothing was written.
    Canceled,
}

/// Totals and diagnostics from a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Parser record counts.
    pub parse_stats: ParseStats,
    /// Points extracted within the date range.
    pub points_extracted: usize,
    /// Points after reduction.
    pub significant_points: usize,
    /// Distinct coordinates sent through place resolution.
    pub unique_coordinates: usize,
    /// Total distance traveled.
    pub total_distance_miles: f64,
    /// Jumps recorded.
    pub jump_count: usize,
    /// Jumps per final transport mode.
    pub mode_distribution: BTreeMap<TransportMode, usize>,
    /// Distinct city labels visited.
    pub cities_visited: usize,
    /// Distinct region labels visited.
    pub regions_visited: usize,
    /// Geocoding counters for the run.
    pub geocoding: StatsSnapshot,
    /// Paths of the written artifacts.
    pub paths: ReportPaths,
}

/// Runs the full pipeline against one export file.
///
/// # Errors
///
/// Returns [`AnalyzeError`] for an unusable input container, an empty
/// in-range point set, or a report-writing failure. Cancellation is not an
/// error — see [`RunOutcome::Canceled`].
#[allow(clippy::too_many_lines)]
pub async fn run(
    input: &Path,
    config: &AnalyzeConfig,
    cancel: &CancelToken,
) -> Result<RunOutcome, AnalyzeError> {
    log::info!(
        "Starting analysis of {} from {} to {}",
        input.display(),
        config.range.start,
        config.range.end
    );

    let parsed = match parse_file(input, &config.range, &config.record_filters, cancel) {
        Ok(parsed) => parsed,
        Err(TimelineError::Canceled) => return Ok(RunOutcome::Canceled),
        Err(e) => return Err(e.into()),
    };
    log::info!(
        "Found {} location points ({} activities, {} visits, {} paths, {} legacy)",
        parsed.points.len(),
        parsed.stats.activities,
        parsed.stats.visits,
        parsed.stats.paths,
        parsed.stats.legacy_points,
    );

    if parsed.points.is_empty() {
        return Err(AnalyzeError::NoPointsInRange {
            start: config.range.start,
            end: config.range.end,
        });
    }

    let points_extracted = parsed.points.len();
    let mut points = parsed.points;
    if config.bucket_dedup {
        points = dedup_coordinate_buckets(&points);
        log::info!("After coordinate-bucket dedup: {} points", points.len());
    }

    let significant = filter_significant(&points, &config.filter);
    log::info!("Filtered to {} significant points", significant.len());

    let coordinates: Vec<(f64, f64)> = significant.iter().map(LocationPoint::coordinate).collect();
    let client = GeocodeClient::new(config.geocoder.clone(), &config.cache_path);

    let resolved = match client.resolve_many(&coordinates, cancel).await {
        Ok(resolved) => resolved,
        Err(GeocodeError::Canceled) => return Ok(RunOutcome::Canceled),
        Err(e) => return Err(e.into()),
    };
    let unique_coordinates = resolved.len();

    let geocoded: Vec<GeocodedPoint> = significant
        .iter()
        .map(|point| {
            let key = GeoCache::place_key(point.latitude, point.longitude);
            let place = resolved
                .get(&key)
                .cloned()
                .unwrap_or_else(|| GeocodeResult::failed("unresolved"));
            GeocodedPoint {
                point: point.clone(),
                place,
            }
        })
        .collect();

    let aggregate_config = AggregateConfig {
        group_by: config.group_by,
        min_jump_miles: config.min_jump_miles,
        jump_dedup: config.jump_dedup,
    };
    let aggregation = match aggregate(&geocoded, &aggregate_config, &client, cancel).await {
        Ok(aggregation) => aggregation,
        Err(AggregateError::Canceled) => return Ok(RunOutcome::Canceled),
    };
    log::info!(
        "Total distance: {:.2} miles, {} jumps",
        aggregation.total_distance_miles,
        aggregation.jumps.len()
    );

    let geocoding = client.stats().snapshot();
    for line in geocoding.summary() {
        log::info!("{line}");
    }

    // No partial artifacts: a cancellation arriving this late still
    // suppresses the report files.
    if cancel.is_canceled() {
        return Ok(RunOutcome::Canceled);
    }

    let meta = ReportMeta {
        range: config.range,
        parse_stats: parsed.stats,
        points_extracted,
        significant_points: significant.len(),
        geocoding_summary: geocoding.summary(),
    };
    let paths = write_reports(&config.output_dir, &aggregation, &meta)?;

    Ok(RunOutcome::Completed(Box::new(RunReport {
        parse_stats: parsed.stats,
        points_extracted,
        significant_points: significant.len(),
        unique_coordinates,
        total_distance_miles: aggregation.total_distance_miles,
        jump_count: aggregation.jumps.len(),
        mode_distribution: mode_distribution(&aggregation.jumps),
        cities_visited: aggregation.city_days.len(),
        regions_visited: aggregation.region_days.len(),
        geocoding,
        paths,
    })))
}
