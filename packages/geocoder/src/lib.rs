#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for the travel map pipeline.
//!
//! Resolves GPS coordinates to administrative places (city/state/country)
//! through a layered strategy:
//!
//! 1. **Persistent cache** ([`cache`]) — a JSON file keyed by rounded
//!    coordinate, consulted before any network traffic. Separate key
//!    namespaces exist for plain place results, per-point water
//!    classification, and per-jump water classification.
//! 2. **Geoapify reverse geocoder** ([`geoapify`]) — queried for cache
//!    misses in bounded-concurrency batches ([`resolve`]), with a single
//!    fixed-backoff retry on HTTP 429 ([`retry`]).
//!
//! A coordinate that cannot be resolved degrades to a placeholder result
//! and an error counter — a total provider outage still yields a result for
//! every input, keeping downstream aggregation total. All cache and counter
//! access is serialized behind mutexes; see [`stats`].

pub mod cache;
pub mod geoapify;
pub mod registry;
pub mod resolve;
pub mod retry;
pub mod stats;
pub mod water;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::GeoCache;
pub use resolve::{GeocodeClient, GeocoderConfig};
pub use stats::{GeocodingStats, StatsFamily, StatsSnapshot};

/// A place resolution for one coordinate. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// City (or county, when the provider reports no city).
    pub city: Option<String>,
    /// State or province.
    pub state: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// Lowercased place name from the provider, or a failure marker.
    #[serde(rename = "place", alias = "place_name", default)]
    pub place_name: String,
    /// Whether the coordinate is over water (provider classification or
    /// place-name heuristic).
    #[serde(default)]
    pub is_water: bool,
}

impl GeocodeResult {
    /// Placeholder recorded when a lookup fails; keeps aggregation total.
    #[must_use]
    pub fn failed(reason: &str) -> Self {
        Self {
            city: Some("Unknown".to_string()),
            state: None,
            country: None,
            place_name: reason.to_string(),
            is_water: true,
        }
    }

    /// Result for a coordinate the provider has no features for.
    #[must_use]
    pub fn open_water() -> Self {
        Self {
            city: Some("Unknown".to_string()),
            state: None,
            country: None,
            place_name: "open water".to_string(),
            is_water: true,
        }
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded (HTTP 429) after the bounded retry.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Cache file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache file serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run was canceled between geocoding batches.
    #[error("geocoding canceled")]
    Canceled,
}
