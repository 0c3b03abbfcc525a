//! Run-wide geocoding counters.
//!
//! Counters split into two families — plain geocoding and water detection —
//! each maintaining the invariant `total == cache_hits + api_calls +
//! errors`. Every cache/network access records exactly one of the three per
//! coordinate. All mutation happens under one mutex; reporting code takes a
//! [`StatsSnapshot`] and never observes a torn update.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// Which counter family an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsFamily {
    /// Plain reverse geocoding.
    Geocoding,
    /// Water/land classification lookups.
    WaterDetection,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: u64,
    api_calls: u64,
    errors: u64,
    water_cache_hits: u64,
    water_api_calls: u64,
    water_errors: u64,
    batch_requests: u64,
    batch_coordinates: u64,
}

/// Thread-safe geocoding statistics for one analysis run.
#[derive(Debug, Default)]
pub struct GeocodingStats {
    inner: Mutex<Counters>,
}

impl GeocodingStats {
    /// Creates a zeroed tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Zeroes every counter, typically at the start of a run.
    pub fn reset(&self) {
        *self.lock() = Counters::default();
    }

    /// Records a coordinate served from the cache.
    pub fn record_cache_hit(&self, family: StatsFamily) {
        let mut counters = self.lock();
        match family {
            StatsFamily::Geocoding => counters.cache_hits += 1,
            StatsFamily::WaterDetection => counters.water_cache_hits += 1,
        }
    }

    /// Records a coordinate resolved by a provider call.
    pub fn record_api_call(&self, family: StatsFamily) {
        let mut counters = self.lock();
        match family {
            StatsFamily::Geocoding => counters.api_calls += 1,
            StatsFamily::WaterDetection => counters.water_api_calls += 1,
        }
    }

    /// Records a coordinate that degraded to a placeholder.
    pub fn record_error(&self, family: StatsFamily) {
        let mut counters = self.lock();
        match family {
            StatsFamily::Geocoding => counters.errors += 1,
            StatsFamily::WaterDetection => counters.water_errors += 1,
        }
    }

    /// Records one batch request covering `coordinates` lookups.
    pub fn record_batch_request(&self, coordinates: u64) {
        let mut counters = self.lock();
        counters.batch_requests += 1;
        counters.batch_coordinates += coordinates;
    }

    /// Takes a consistent point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.lock();
        #[allow(clippy::cast_precision_loss)]
        let avg_batch_size = if counters.batch_requests == 0 {
            0.0
        } else {
            counters.batch_coordinates as f64 / counters.batch_requests as f64
        };

        StatsSnapshot {
            geocoding: FamilySnapshot {
                cache_hits: counters.cache_hits,
                api_calls: counters.api_calls,
                errors: counters.errors,
                total: counters.cache_hits + counters.api_calls + counters.errors,
            },
            water_detection: FamilySnapshot {
                cache_hits: counters.water_cache_hits,
                api_calls: counters.water_api_calls,
                errors: counters.water_errors,
                total: counters.water_cache_hits + counters.water_api_calls + counters.water_errors,
            },
            batch_requests: counters.batch_requests,
            avg_batch_size,
        }
    }
}

/// Snapshot of one counter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FamilySnapshot {
    /// Coordinates served from the cache.
    pub cache_hits: u64,
    /// Coordinates resolved by provider calls.
    pub api_calls: u64,
    /// Coordinates that degraded to placeholders.
    pub errors: u64,
    /// Always `cache_hits + api_calls + errors`.
    pub total: u64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Plain geocoding family.
    pub geocoding: FamilySnapshot,
    /// Water detection family.
    pub water_detection: FamilySnapshot,
    /// Batch requests issued.
    pub batch_requests: u64,
    /// Mean coordinates per batch, zero when no batches ran.
    pub avg_batch_size: f64,
}

impl StatsSnapshot {
    /// Human-readable summary lines for logs and the summary artifact.
    /// Families with no activity produce no lines.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if self.geocoding.total > 0 {
            let batch_info = if self.batch_requests > 0 {
                format!(
                    " ({} batch requests, avg {:.1} coords/batch)",
                    self.batch_requests, self.avg_batch_size
                )
            } else {
                String::new()
            };
            lines.push(format!(
                "Geocoded {} locations: {} from cache, {} from API lookups{batch_info}",
                self.geocoding.total, self.geocoding.cache_hits, self.geocoding.api_calls
            ));
            if self.geocoding.errors > 0 {
                lines.push(format!("Geocoding errors: {}", self.geocoding.errors));
            }
        }

        if self.water_detection.total > 0 {
            lines.push(format!(
                "Water detection for {} locations: {} from cache, {} from API calls",
                self.water_detection.total,
                self.water_detection.cache_hits,
                self.water_detection.api_calls
            ));
            if self.water_detection.errors > 0 {
                lines.push(format!(
                    "Water detection errors: {}",
                    self.water_detection.errors
                ));
            }
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_equal_hits_plus_calls_plus_errors() {
        let stats = GeocodingStats::new();
        for _ in 0..3 {
            stats.record_cache_hit(StatsFamily::Geocoding);
        }
        for _ in 0..2 {
            stats.record_api_call(StatsFamily::Geocoding);
        }
        stats.record_error(StatsFamily::Geocoding);
        stats.record_cache_hit(StatsFamily::WaterDetection);
        stats.record_error(StatsFamily::WaterDetection);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.geocoding.total, 6);
        assert_eq!(
            snapshot.geocoding.total,
            snapshot.geocoding.cache_hits + snapshot.geocoding.api_calls + snapshot.geocoding.errors
        );
        assert_eq!(snapshot.water_detection.total, 2);
        assert_eq!(
            snapshot.water_detection.total,
            snapshot.water_detection.cache_hits
                + snapshot.water_detection.api_calls
                + snapshot.water_detection.errors
        );
    }

    #[test]
    fn batch_average_covers_all_batches() {
        let stats = GeocodingStats::new();
        stats.record_batch_request(25);
        stats.record_batch_request(5);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.batch_requests, 2);
        assert!((snapshot.avg_batch_size - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_zeroes_everything() {
        let stats = GeocodingStats::new();
        stats.record_api_call(StatsFamily::Geocoding);
        stats.record_batch_request(10);
        stats.reset();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.geocoding.total, 0);
        assert_eq!(snapshot.batch_requests, 0);
        assert!(snapshot.summary().is_empty());
    }

    #[test]
    fn summary_mentions_errors_only_when_present() {
        let stats = GeocodingStats::new();
        stats.record_cache_hit(StatsFamily::Geocoding);
        let lines = stats.snapshot().summary();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Geocoded 1 locations"));

        stats.record_error(StatsFamily::Geocoding);
        let lines = stats.snapshot().summary();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("errors: 1"));
    }
}
