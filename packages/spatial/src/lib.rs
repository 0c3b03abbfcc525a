#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Great-circle geometry helpers for the travel map pipeline.
//!
//! Distances are returned in **miles** because every downstream threshold
//! (significance filter, jump minimum, mode classifier ladder) is specified
//! in miles. Coordinates are `(latitude, longitude)` pairs in decimal
//! degrees (WGS84).

use geo::{Distance, Haversine, Point};

/// Meters per statute mile.
const METERS_PER_MILE: f64 = 1_609.344;

/// Jumps shorter than this sample a third point at the path midpoint when
/// checking for open water.
const MIDPOINT_SAMPLE_LIMIT_MILES: f64 = 10.0;

/// Great-circle distance between two coordinates, in miles.
///
/// Symmetric, and zero for identical coordinates.
#[must_use]
pub fn haversine_miles(from: (f64, f64), to: (f64, f64)) -> f64 {
    let a = Point::new(from.1, from.0);
    let b = Point::new(to.1, to.0);
    Haversine::distance(a, b) / METERS_PER_MILE
}

/// Arithmetic midpoint of two coordinates.
///
/// Not a true great-circle midpoint, but jump water checks only ever sample
/// short-to-mid-range hops where the difference is negligible. Do not use
/// across the antimeridian.
#[must_use]
pub fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// Coordinates to probe when deciding whether a jump crosses open water.
///
/// Short jumps (under [`MIDPOINT_SAMPLE_LIMIT_MILES`]) include the midpoint
/// so a hop across a narrow channel is not missed; longer jumps probe only
/// the endpoints.
#[must_use]
pub fn jump_sample_points(from: (f64, f64), to: (f64, f64), distance_miles: f64) -> Vec<(f64, f64)> {
    if distance_miles < MIDPOINT_SAMPLE_LIMIT_MILES {
        vec![from, midpoint(from, to), to]
    } else {
        vec![from, to]
    }
}
