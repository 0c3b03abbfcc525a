#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the travel map analysis pipeline.
//!
//! Parses a location-history export, reduces and geocodes the point
//! stream, and writes the time-per-place, jump, and summary artifacts.
//! Logging goes through `pretty_env_logger` (`RUST_LOG` controls
//! verbosity); Ctrl-C flips the cooperative cancellation token so an
//! in-flight run stops cleanly without partial artifacts.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use travel_map_analytics::JumpDedupPolicy;
use travel_map_analytics_models::GroupBy;
use travel_map_analyzer::{AnalyzeConfig, RunOutcome, run};
use travel_map_geocoder::GeocoderConfig;
use travel_map_timeline::{FilterConfig, RecordFilters};
use travel_map_timeline_models::{CancelToken, DateRange};

/// Analyze a location-history export into travel reports.
#[derive(Parser)]
#[command(name = "travel_map", about = "Location history travel analysis")]
struct Cli {
    /// Location history export JSON file
    input: PathBuf,

    /// First day of the analysis range (YYYY-MM-DD)
    #[arg(long)]
    from: NaiveDate,

    /// Last day of the analysis range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: NaiveDate,

    /// Directory for the report artifacts
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Grouping for jump labels: by_city or by_state
    #[arg(long, default_value = "by_city")]
    group_by: GroupBy,

    /// Geoapify API key
    #[arg(long, env = "GEOAPIFY_API_KEY")]
    api_key: String,

    /// Geocode cache file
    #[arg(long, default_value = "config/geo_cache.json")]
    cache: PathBuf,

    /// Use the strict significance thresholds (0.124 mi / 10 min)
    #[arg(long)]
    strict_filter: bool,

    /// Collapse duplicate points per rounded coordinate and 10-minute bucket
    #[arg(long)]
    bucket_dedup: bool,

    /// Keep every record regardless of the screening thresholds
    #[arg(long)]
    no_screen: bool,

    /// Record each (from, to) jump pair only once per run
    #[arg(long)]
    dedup_jumps: bool,

    /// Minimum distance in miles for a place change to count as a jump
    #[arg(long, default_value_t = 10.0)]
    min_jump_miles: f64,

    /// Maximum concurrent geocoding lookups
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Coordinates per geocoding batch (capped at 25)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Delay between geocoding batches in milliseconds
    #[arg(long)]
    batch_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut geocoder = GeocoderConfig::new(cli.api_key);
    if let Some(n) = cli.max_concurrent {
        geocoder.max_concurrent_requests = n;
    }
    if let Some(n) = cli.batch_size {
        geocoder.batch_size = n;
    }
    if let Some(ms) = cli.batch_delay_ms {
        geocoder.batch_delay = Duration::from_millis(ms);
    }

    let config = AnalyzeConfig {
        range: DateRange::new(cli.from, cli.to),
        group_by: cli.group_by,
        filter: if cli.strict_filter {
            FilterConfig::STRICT
        } else {
            FilterConfig::STANDARD
        },
        bucket_dedup: cli.bucket_dedup,
        record_filters: if cli.no_screen {
            RecordFilters::disabled()
        } else {
            RecordFilters::default()
        },
        geocoder,
        cache_path: cli.cache,
        output_dir: cli.output_dir,
        min_jump_miles: cli.min_jump_miles,
        jump_dedup: if cli.dedup_jumps {
            JumpDedupPolicy::UniquePairs
        } else {
            JumpDedupPolicy::AllTransitions
        },
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received, canceling run...");
                cancel.cancel();
            }
        });
    }

    match run(&cli.input, &config, &cancel).await? {
        RunOutcome::Completed(report) => {
            println!("Analysis complete");
            println!(
                "  Points: {} extracted, {} significant, {} unique coordinates",
                report.points_extracted, report.significant_points, report.unique_coordinates
            );
            println!(
                "  Total distance: {:.2} miles across {} jumps",
                report.total_distance_miles, report.jump_count
            );
            for (mode, count) in &report.mode_distribution {
                println!("    {mode}: {count} jumps");
            }
            println!(
                "  Places: {} cities, {} states/countries",
                report.cities_visited, report.regions_visited
            );
            for line in report.geocoding.summary() {
                println!("  {line}");
            }
            println!("  Reports written to {}", config.output_dir.display());
        }
        RunOutcome::Canceled => println!("Analysis canceled"),
    }

    Ok(())
}
