//! Water/land classification for points and jumps.
//!
//! A point's water flag comes from the `water:` cache namespace, falling
//! back to a reverse-geocode lookup whose result is cached under both the
//! plain and `water:` keys. A jump's flag is cached per endpoint pair under
//! the `jump:` namespace; on miss the great-circle path is sampled (two or
//! three points, see [`travel_map_spatial::jump_sample_points`]) and a
//! majority vote decides, with a watery destination name forcing the
//! verdict. The jump verdict is persisted immediately so re-runs never
//! repeat the sampling.

use crate::resolve::GeocodeClient;
use crate::stats::StatsFamily;
use crate::geoapify;

impl GeocodeClient {
    /// Whether a single coordinate is over water.
    ///
    /// Returns `None` when the cache misses and the live lookup fails; the
    /// caller treats an unknown as a non-water vote.
    pub async fn is_point_water(&self, lat: f64, lon: f64) -> Option<bool> {
        if let Some(flag) = self.lock_cache().get_water(lat, lon) {
            self.stats().record_cache_hit(StatsFamily::WaterDetection);
            log::debug!(
                "Water cache hit for ({lat:.5}, {lon:.5}): {}",
                if flag { "water" } else { "land" }
            );
            return Some(flag);
        }

        match self.lookup(lat, lon).await {
            Ok(result) => {
                self.stats().record_api_call(StatsFamily::WaterDetection);
                let flag = result.is_water;
                let mut cache = self.lock_cache();
                cache.put_place(lat, lon, result);
                cache.put_water(lat, lon, flag);
                Some(flag)
            }
            Err(e) => {
                log::warn!("Water lookup failed for ({lat:.5}, {lon:.5}): {e}");
                self.stats().record_error(StatsFamily::WaterDetection);
                None
            }
        }
    }

    /// Whether a jump between two coordinates crosses open water.
    ///
    /// Deterministic given cache state: the verdict is cached per endpoint
    /// pair, so only the first check for a pair can touch the network.
    pub async fn jump_over_water(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        distance_miles: f64,
        dest_place_name: &str,
    ) -> bool {
        if let Some(flag) = self.lock_cache().get_jump_water(from, to) {
            self.stats().record_cache_hit(StatsFamily::WaterDetection);
            log::debug!(
                "Jump water cache hit for ({:.5},{:.5})->({:.5},{:.5}): {}",
                from.0,
                from.1,
                to.0,
                to.1,
                if flag { "water" } else { "land" }
            );
            return flag;
        }

        let samples = travel_map_spatial::jump_sample_points(from, to, distance_miles);
        let mut water_votes = 0usize;
        for &(lat, lon) in &samples {
            if self.is_point_water(lat, lon).await == Some(true) {
                water_votes += 1;
            }
        }

        let watery_name = geoapify::has_water_token(dest_place_name);
        let is_water = water_votes * 2 > samples.len() || watery_name;
        log::info!(
            "Water check for jump ({:.5},{:.5})->({:.5},{:.5}) dist={distance_miles:.2} mi: \
             {water_votes}/{} water votes, watery destination name: {watery_name} => {}",
            from.0,
            from.1,
            to.0,
            to.1,
            samples.len(),
            if is_water { "water" } else { "land" }
        );

        self.lock_cache().put_jump_water(from, to, is_water);
        self.persist_cache();

        is_water
    }
}
