#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Timeline export parsing and point-stream reduction.
//!
//! A location-history export is a JSON document containing heterogeneous
//! "timeline object" records in four shapes (activity segments, place
//! visits, waypoint paths, legacy flat points). This crate classifies each
//! record into exactly one tagged variant before touching its fields
//! ([`record`]), extracts timestamped coordinates within a requested date
//! range ([`parse`]), and reduces the resulting point stream with
//! distance/time significance filtering and coordinate-bucket deduplication
//! ([`filter`]).
//!
//! Malformed records never fail a parse — they are counted and skipped. The
//! only fatal conditions are an unreadable file, a top-level JSON shape that
//! is not a recognized container, and cooperative cancellation.

pub mod filter;
pub mod parse;
pub mod record;

use thiserror::Error;

pub use filter::{FilterConfig, dedup_coordinate_buckets, filter_significant};
pub use parse::{ParsedTimeline, RecordFilters, parse_file, parse_slice};

/// Errors from timeline parsing.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Reading the input file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level JSON shape is neither a record list nor a recognized
    /// wrapper object.
    #[error(
        "unsupported top-level JSON shape (expected a record list or a \
         `timelineObjects`/`locations` wrapper)"
    )]
    UnsupportedContainer,

    /// The run was canceled while parsing.
    #[error("parsing canceled")]
    Canceled,
}
