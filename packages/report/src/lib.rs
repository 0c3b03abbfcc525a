#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report artifacts for one analysis run.
//!
//! Three CSV files and a text summary land in the output directory:
//!
//! - `by_city_location_days.csv` — fractional days per city, descending
//! - `by_state_location_days.csv` — same per US-state/country
//! - `city_jumps_with_mode.csv` — chronological jumps with classified mode
//! - `analysis_summary.txt` — totals, top-10 places by both groupings,
//!   mode distribution, and the geocoding statistics disclosure
//!
//! Unlike geocoding failures, report I/O failures are fatal to the run —
//! the artifacts *are* the output.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;
use travel_map_analytics_models::{
    Aggregation, LocationJump, PlaceLedger, TransportMode, ranked_places,
};
use travel_map_timeline_models::{DateRange, ParseStats};

/// Errors from report writing.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Creating the output directory or writing the summary failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing a CSV artifact failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Run context included in the summary artifact.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    /// Analyzed date range.
    pub range: DateRange,
    /// Parser record counts.
    pub parse_stats: ParseStats,
    /// Points extracted before reduction.
    pub points_extracted: usize,
    /// Points remaining after reduction.
    pub significant_points: usize,
    /// Geocoding statistics disclosure lines.
    pub geocoding_summary: Vec<String>,
}

/// Paths of the written artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// Per-city ledger CSV.
    pub city_days: PathBuf,
    /// Per-region ledger CSV.
    pub region_days: PathBuf,
    /// Jump list CSV.
    pub jumps: PathBuf,
    /// Text summary.
    pub summary: PathBuf,
}

/// Jumps per final transport mode, for the summary and the run report.
#[must_use]
pub fn mode_distribution(jumps: &[LocationJump]) -> BTreeMap<TransportMode, usize> {
    let mut counts = BTreeMap::new();
    for jump in jumps {
        *counts.entry(jump.mode).or_insert(0) += 1;
    }
    counts
}

/// Writes all artifacts into `output_dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`ReportError`] if the directory cannot be created or any
/// artifact cannot be written.
pub fn write_reports(
    output_dir: &Path,
    aggregation: &Aggregation,
    meta: &ReportMeta,
) -> Result<ReportPaths, ReportError> {
    std::fs::create_dir_all(output_dir)?;

    let paths = ReportPaths {
        city_days: output_dir.join("by_city_location_days.csv"),
        region_days: output_dir.join("by_state_location_days.csv"),
        jumps: output_dir.join("city_jumps_with_mode.csv"),
        summary: output_dir.join("analysis_summary.txt"),
    };

    write_place_days_csv(&paths.city_days, &aggregation.city_days)?;
    write_place_days_csv(&paths.region_days, &aggregation.region_days)?;
    write_jumps_csv(&paths.jumps, &aggregation.jumps)?;
    std::fs::write(&paths.summary, render_summary(aggregation, meta))?;

    log::info!("Results exported to {}", output_dir.display());
    Ok(paths)
}

fn write_place_days_csv(path: &Path, ledger: &PlaceLedger) -> Result<(), ReportError> {
    log::debug!("Writing {}", path.display());
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Location", "Fractional Days"])?;
    for (place, days) in ranked_places(ledger) {
        writer.write_record([place, &format!("{days:.1}")])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_jumps_csv(path: &Path, jumps: &[LocationJump]) -> Result<(), ReportError> {
    log::debug!("Writing {}", path.display());
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Date", "From", "To", "Mode", "Distance (mi)"])?;
    for jump in jumps {
        writer.write_record([
            jump.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            jump.from_place.clone(),
            jump.to_place.clone(),
            jump.mode.to_string(),
            format!("{:.2}", jump.distance_miles),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn render_summary(aggregation: &Aggregation, meta: &ReportMeta) -> String {
    let mut text = String::new();
    let push = |text: &mut String, line: &str| {
        text.push_str(line);
        text.push('\n');
    };

    push(&mut text, "LOCATION ANALYSIS SUMMARY");
    push(&mut text, &"=".repeat(50));
    push(&mut text, "");
    let _ = writeln!(
        text,
        "Analysis Period: {} to {}",
        meta.range.start, meta.range.end
    );
    let _ = writeln!(
        text,
        "Total Records Processed: {}",
        meta.parse_stats.total_records
    );
    let _ = writeln!(
        text,
        "Activities: {}, Visits: {}, Paths: {}, Legacy Points: {}, Unrecognized: {}",
        meta.parse_stats.activities,
        meta.parse_stats.visits,
        meta.parse_stats.paths,
        meta.parse_stats.legacy_points,
        meta.parse_stats.unrecognized,
    );
    let _ = writeln!(text, "Location Points Extracted: {}", meta.points_extracted);
    let _ = writeln!(text, "Significant Points: {}", meta.significant_points);
    let _ = writeln!(
        text,
        "Total Distance Traveled: {:.2} miles",
        aggregation.total_distance_miles
    );
    let _ = writeln!(text, "Total Location Jumps: {}", aggregation.jumps.len());
    let _ = writeln!(text, "Cities Visited: {}", aggregation.city_days.len());
    let _ = writeln!(
        text,
        "States/Countries Visited: {}",
        aggregation.region_days.len()
    );
    push(&mut text, "");

    render_top_places(&mut text, "TOP 10 CITIES BY TIME SPENT:", &aggregation.city_days);
    push(&mut text, "");
    render_top_places(
        &mut text,
        "TOP 10 STATES/COUNTRIES BY TIME SPENT:",
        &aggregation.region_days,
    );

    let modes = mode_distribution(&aggregation.jumps);
    if !modes.is_empty() {
        push(&mut text, "");
        push(&mut text, "MODE DISTRIBUTION:");
        for (mode, count) in &modes {
            let _ = writeln!(text, "  {mode}: {count} jumps");
        }
    }

    if !meta.geocoding_summary.is_empty() {
        push(&mut text, "");
        push(&mut text, "GEOCODING:");
        for line in &meta.geocoding_summary {
            let _ = writeln!(text, "  {line}");
        }
    }

    text
}

fn render_top_places(text: &mut String, title: &str, ledger: &PlaceLedger) {
    text.push_str(title);
    text.push('\n');
    text.push_str(&"-".repeat(title.len()));
    text.push('\n');
    for (rank, (place, days)) in ranked_places(ledger).into_iter().take(10).enumerate() {
        let _ = writeln!(text, "{:2}. {place}: {days:.1} days", rank + 1);
    }
}
