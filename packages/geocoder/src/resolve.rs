//! Cache-first batch coordinate resolution.
//!
//! [`GeocodeClient::resolve_many`] partitions its input into cached and
//! uncached coordinates, then works through the uncached ones in batches.
//! Within a batch, lookups run concurrently through a buffered stream so
//! the number of outstanding requests never exceeds the configured cap; a
//! fixed delay between batches keeps the provider's rate limiter happy.
//!
//! Lookup failures never propagate: a failed coordinate degrades to a
//! placeholder result and an error counter, so every input coordinate gets
//! a result even during a total provider outage. Only cancellation aborts
//! the call, and it keeps whatever was already individually cached.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::stream::{self, StreamExt as _};
use travel_map_timeline_models::CancelToken;

use crate::cache::GeoCache;
use crate::registry::{self, ProviderService};
use crate::stats::{GeocodingStats, StatsFamily};
use crate::{GeocodeError, GeocodeResult, geoapify, retry};

/// Hard cap on coordinates per batch, independent of configuration.
pub const MAX_BATCH_SIZE: usize = 25;

/// Tunable settings for one [`GeocodeClient`].
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Provider API key.
    pub api_key: String,
    /// Reverse geocoding endpoint URL.
    pub base_url: String,
    /// Coordinates per batch (clamped to [`MAX_BATCH_SIZE`]).
    pub batch_size: usize,
    /// Maximum concurrent outstanding lookups.
    pub max_concurrent_requests: usize,
    /// Pause between batches.
    pub batch_delay: Duration,
    /// Backoff before the single rate-limit retry.
    pub retry_backoff: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl GeocoderConfig {
    /// Settings from the default registered provider.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_service(api_key, &registry::default_service())
    }

    /// Settings from a specific provider configuration.
    #[must_use]
    pub fn from_service(api_key: impl Into<String>, service: &ProviderService) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: service.base_url.clone(),
            batch_size: service.max_batch_size,
            max_concurrent_requests: service.max_concurrent_requests,
            batch_delay: Duration::from_millis(service.batch_delay_ms),
            retry_backoff: Duration::from_millis(service.retry_backoff_ms),
            request_timeout: Duration::from_secs(service.request_timeout_secs),
        }
    }
}

/// A reverse geocoder bound to one cache file and one stats tracker.
///
/// Constructed once per run and shared by reference; the cache and counters
/// are the only shared mutable state in the pipeline, each behind its own
/// mutex.
#[derive(Debug)]
pub struct GeocodeClient {
    http: reqwest::Client,
    config: GeocoderConfig,
    cache: Mutex<GeoCache>,
    cache_path: PathBuf,
    stats: GeocodingStats,
}

impl GeocodeClient {
    /// Creates a client, loading the persistent cache from `cache_path`.
    /// A missing or corrupt cache file starts empty and is not an error.
    #[must_use]
    pub fn new(config: GeocoderConfig, cache_path: impl Into<PathBuf>) -> Self {
        let cache_path = cache_path.into();
        let cache = GeoCache::load(&cache_path);
        Self {
            http: reqwest::Client::new(),
            config,
            cache: Mutex::new(cache),
            cache_path,
            stats: GeocodingStats::new(),
        }
    }

    /// The run's geocoding counters.
    #[must_use]
    pub const fn stats(&self) -> &GeocodingStats {
        &self.stats
    }

    /// Number of entries currently cached (all namespaces).
    #[must_use]
    pub fn cache_entries(&self) -> usize {
        self.lock_cache().len()
    }

    pub(crate) fn lock_cache(&self) -> MutexGuard<'_, GeoCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves every coordinate to a [`GeocodeResult`], keyed by the
    /// 5-decimal cache key ([`GeoCache::place_key`]). Coordinates rounding
    /// to the same key share one resolution.
    ///
    /// The cache is persisted once at the end of the call (and before a
    /// cancellation return), not per coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Canceled`] if the run is canceled between
    /// batches. Lookup failures do not propagate — they produce placeholder
    /// results and error counts.
    pub async fn resolve_many(
        &self,
        coordinates: &[(f64, f64)],
        cancel: &CancelToken,
    ) -> Result<BTreeMap<String, GeocodeResult>, GeocodeError> {
        let mut results = BTreeMap::new();
        let mut uncached: Vec<(f64, f64)> = Vec::new();

        {
            let cache = self.lock_cache();
            let mut seen = HashSet::new();
            for &(lat, lon) in coordinates {
                let key = GeoCache::place_key(lat, lon);
                if !seen.insert(key.clone()) {
                    continue;
                }
                if let Some(result) = cache.get_place(lat, lon) {
                    self.stats.record_cache_hit(StatsFamily::Geocoding);
                    results.insert(key, result.clone());
                } else {
                    uncached.push((lat, lon));
                }
            }
        }

        if uncached.is_empty() {
            log::info!(
                "All {} coordinates found in geocode cache, no API calls needed",
                results.len()
            );
            return Ok(results);
        }
        log::info!(
            "Geocode cache hits: {}, coordinates to resolve: {}",
            results.len(),
            uncached.len()
        );

        let batch_size = self.config.batch_size.clamp(1, MAX_BATCH_SIZE);
        let concurrency = self.config.max_concurrent_requests.max(1);
        let batches: Vec<&[(f64, f64)]> = uncached.chunks(batch_size).collect();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            if cancel.is_canceled() {
                log::info!("Geocoding canceled after {index}/{batch_count} batches");
                self.persist_cache();
                return Err(GeocodeError::Canceled);
            }

            log::info!(
                "Processing geocode batch {}/{batch_count} ({} coordinates)",
                index + 1,
                batch.len()
            );
            self.stats.record_batch_request(batch.len() as u64);

            let lookups: Vec<(f64, f64, Result<GeocodeResult, GeocodeError>)> =
                stream::iter(
                    batch
                        .iter()
                        .map(|&(lat, lon)| async move { (lat, lon, self.lookup(lat, lon).await) }),
                )
                .buffer_unordered(concurrency.min(batch.len()))
                .collect()
                .await;

            let mut cache = self.lock_cache();
            for (lat, lon, outcome) in lookups {
                let result = match outcome {
                    Ok(result) => {
                        self.stats.record_api_call(StatsFamily::Geocoding);
                        result
                    }
                    Err(e) => {
                        log::warn!("Geocoding failed for ({lat:.5}, {lon:.5}): {e}");
                        self.stats.record_error(StatsFamily::Geocoding);
                        GeocodeResult::failed("geocoding failed")
                    }
                };
                cache.put_place(lat, lon, result.clone());
                results.insert(GeoCache::place_key(lat, lon), result);
            }
            drop(cache);

            if index + 1 < batch_count {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        self.persist_cache();
        Ok(results)
    }

    /// One provider lookup with the bounded rate-limit retry.
    pub(crate) async fn lookup(&self, lat: f64, lon: f64) -> Result<GeocodeResult, GeocodeError> {
        retry::once_on_rate_limit(self.config.retry_backoff, || {
            geoapify::reverse_geocode(
                &self.http,
                &self.config.base_url,
                &self.config.api_key,
                lat,
                lon,
                self.config.request_timeout,
            )
        })
        .await
    }

    /// Writes the cache to disk; failure is logged, never fatal.
    pub(crate) fn persist_cache(&self) {
        let cache = self.lock_cache();
        if let Err(e) = cache.save(&self.cache_path) {
            log::error!(
                "Failed to save geocode cache to {}: {e}",
                self.cache_path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("travel_map_resolve_{tag}_{}.json", std::process::id()))
    }

    fn offline_config() -> GeocoderConfig {
        // Unroutable endpoint: any network attempt fails fast instead of
        // leaving the test hanging.
        GeocoderConfig {
            api_key: String::new(),
            base_url: "http://127.0.0.1:9".to_string(),
            batch_size: 25,
            max_concurrent_requests: 8,
            batch_delay: Duration::from_millis(1),
            retry_backoff: Duration::from_millis(1),
            request_timeout: Duration::from_millis(200),
        }
    }

    fn warmed_client(tag: &str, coords: &[(f64, f64)]) -> (GeocodeClient, PathBuf) {
        let path = temp_cache_path(tag);
        let mut cache = GeoCache::new();
        for &(lat, lon) in coords {
            cache.put_place(
                lat,
                lon,
                GeocodeResult {
                    city: Some("Paris".to_string()),
                    state: None,
                    country: Some("France".to_string()),
                    place_name: "paris".to_string(),
                    is_water: false,
                },
            );
        }
        cache.save(&path).unwrap();
        (GeocodeClient::new(offline_config(), &path), path)
    }

    #[tokio::test]
    async fn warmed_cache_resolves_without_network() {
        let coords = [(48.8566, 2.3522), (48.8606, 2.3376)];
        let (client, path) = warmed_client("warm", &coords);

        let results = client
            .resolve_many(&coords, &CancelToken::new())
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(results.len(), 2);
        let snapshot = client.stats().snapshot();
        assert_eq!(snapshot.geocoding.cache_hits, 2);
        assert_eq!(snapshot.geocoding.api_calls, 0);
        assert_eq!(snapshot.geocoding.errors, 0);
    }

    #[tokio::test]
    async fn repeated_resolution_is_idempotent_with_no_extra_calls() {
        let coords = [(48.8566, 2.3522)];
        let (client, path) = warmed_client("idem", &coords);

        let first = client
            .resolve_many(&coords, &CancelToken::new())
            .await
            .unwrap();
        let second = client
            .resolve_many(&coords, &CancelToken::new())
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(first, second);
        let snapshot = client.stats().snapshot();
        assert_eq!(snapshot.geocoding.api_calls, 0);
        assert_eq!(snapshot.geocoding.cache_hits, 2);
    }

    #[tokio::test]
    async fn duplicate_coordinates_share_one_resolution() {
        let unique = (48.8566, 2.3522);
        let (client, path) = warmed_client("dup", &[unique]);

        let results = client
            .resolve_many(&[unique, unique, (48.856_601, 2.352_199)], &CancelToken::new())
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        // All three round to one 5-decimal key.
        assert_eq!(results.len(), 1);
        assert_eq!(client.stats().snapshot().geocoding.cache_hits, 1);
    }

    #[tokio::test]
    async fn cancellation_before_first_batch_aborts() {
        let path = temp_cache_path("cancel");
        let client = GeocodeClient::new(offline_config(), &path);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = client.resolve_many(&[(10.0, 20.0)], &cancel).await;
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(GeocodeError::Canceled)));
    }

    #[tokio::test]
    async fn provider_outage_degrades_to_placeholders() {
        let path = temp_cache_path("outage");
        let client = GeocodeClient::new(offline_config(), &path);

        let results = client
            .resolve_many(&[(10.0, 20.0)], &CancelToken::new())
            .await
            .unwrap();
        std::fs::remove_file(&path).ok();

        let key = GeoCache::place_key(10.0, 20.0);
        let placeholder = &results[&key];
        assert!(placeholder.is_water);
        assert_eq!(placeholder.place_name, "geocoding failed");

        let snapshot = client.stats().snapshot();
        assert_eq!(snapshot.geocoding.errors, 1);
        assert_eq!(snapshot.geocoding.api_calls, 0);
        assert_eq!(snapshot.batch_requests, 1);
    }
}
