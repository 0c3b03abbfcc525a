//! Persistent coordinate-to-place cache.
//!
//! One JSON object maps string keys to either a place result or a bare
//! water boolean. Keys are derived from coordinates rounded to 5 decimals
//! (~1 m), with a 4-decimal fallback consulted on miss to absorb precision
//! drift between producers. Three namespaces share the file:
//!
//! - `"<lat>,<lon>"` — plain reverse-geocode results
//! - `"water:<lat>,<lon>"` — water/land classification of a point
//! - `"jump:<lat>,<lon>:<lat>,<lon>"` — water classification of a jump
//!
//! A key, once written, is only replaced by a caller that deliberately
//! re-checks; nothing in this module overwrites entries on its own. `save`
//! rewrites the whole file — callers serialize saves (the client holds the
//! cache behind a mutex). Load failure is non-fatal: the cache starts empty
//! and a diagnostic is logged.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{GeocodeError, GeocodeResult};

/// Primary key precision (decimal places).
const KEY_PRECISION: usize = 5;

/// Fallback key precision consulted on primary miss.
const FALLBACK_PRECISION: usize = 4;

/// One persisted cache value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheEntry {
    /// Water/land flag for a `water:` or `jump:` key.
    Water(bool),
    /// Place result for a plain coordinate key.
    Place(GeocodeResult),
}

/// In-memory view of the cache file.
#[derive(Debug, Clone, Default)]
pub struct GeoCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl GeoCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical key text for a coordinate at the given precision.
    #[must_use]
    pub fn coord_key(lat: f64, lon: f64, precision: usize) -> String {
        format!("{lat:.precision$},{lon:.precision$}")
    }

    /// Primary (5-decimal) key for a plain place lookup.
    #[must_use]
    pub fn place_key(lat: f64, lon: f64) -> String {
        Self::coord_key(lat, lon, KEY_PRECISION)
    }

    fn water_key(lat: f64, lon: f64, precision: usize) -> String {
        format!("water:{}", Self::coord_key(lat, lon, precision))
    }

    fn jump_key(from: (f64, f64), to: (f64, f64), precision: usize) -> String {
        format!(
            "jump:{}:{}",
            Self::coord_key(from.0, from.1, precision),
            Self::coord_key(to.0, to.1, precision),
        )
    }

    fn place_at(&self, key: &str) -> Option<&GeocodeResult> {
        match self.entries.get(key) {
            Some(CacheEntry::Place(result)) => Some(result),
            _ => None,
        }
    }

    fn water_at(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(CacheEntry::Water(flag)) => Some(*flag),
            _ => None,
        }
    }

    /// Looks up a place result, trying the 5-decimal key then the 4-decimal
    /// fallback.
    #[must_use]
    pub fn get_place(&self, lat: f64, lon: f64) -> Option<&GeocodeResult> {
        self.place_at(&Self::coord_key(lat, lon, KEY_PRECISION))
            .or_else(|| self.place_at(&Self::coord_key(lat, lon, FALLBACK_PRECISION)))
    }

    /// Stores a place result under the coordinate's primary key.
    pub fn put_place(&mut self, lat: f64, lon: f64, result: GeocodeResult) {
        self.entries
            .insert(Self::place_key(lat, lon), CacheEntry::Place(result));
    }

    /// Looks up a point water flag, trying both precisions.
    #[must_use]
    pub fn get_water(&self, lat: f64, lon: f64) -> Option<bool> {
        self.water_at(&Self::water_key(lat, lon, KEY_PRECISION))
            .or_else(|| self.water_at(&Self::water_key(lat, lon, FALLBACK_PRECISION)))
    }

    /// Stores a point water flag under the coordinate's primary key.
    pub fn put_water(&mut self, lat: f64, lon: f64, is_water: bool) {
        self.entries.insert(
            Self::water_key(lat, lon, KEY_PRECISION),
            CacheEntry::Water(is_water),
        );
    }

    /// Looks up a jump water flag, trying both precisions.
    #[must_use]
    pub fn get_jump_water(&self, from: (f64, f64), to: (f64, f64)) -> Option<bool> {
        self.water_at(&Self::jump_key(from, to, KEY_PRECISION))
            .or_else(|| self.water_at(&Self::jump_key(from, to, FALLBACK_PRECISION)))
    }

    /// Stores a jump water flag under the pair's primary key.
    pub fn put_jump_water(&mut self, from: (f64, f64), to: (f64, f64), is_water: bool) {
        self.entries.insert(
            Self::jump_key(from, to, KEY_PRECISION),
            CacheEntry::Water(is_water),
        );
    }

    /// Loads the cache from disk. Never fails: a missing file yields an
    /// empty cache silently; unreadable files or unparseable entries are
    /// logged and skipped.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                log::warn!("Failed to read geocode cache {}: {e}", path.display());
                return Self::default();
            }
        };

        let raw: BTreeMap<String, serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Failed to parse geocode cache {}: {e}", path.display());
                return Self::default();
            }
        };

        let mut entries = BTreeMap::new();
        let mut skipped = 0usize;
        for (key, value) in raw {
            match serde_json::from_value::<CacheEntry>(value) {
                Ok(entry) => {
                    entries.insert(key, entry);
                }
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!(
                "Skipped {skipped} unparseable entries in geocode cache {}",
                path.display()
            );
        }
        log::info!(
            "Loaded {} geocode cache entries from {}",
            entries.len(),
            path.display()
        );

        Self { entries }
    }

    /// Rewrites the whole cache file.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the parent directory cannot be created or
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), GeocodeError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec(&self.entries)?;
        std::fs::write(path, bytes)?;
        log::debug!(
            "Saved {} geocode cache entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(city: &str) -> GeocodeResult {
        GeocodeResult {
            city: Some(city.to_string()),
            state: None,
            country: Some("France".to_string()),
            place_name: city.to_lowercase(),
            is_water: false,
        }
    }

    #[test]
    fn put_then_get_hits_at_primary_precision() {
        let mut cache = GeoCache::new();
        cache.put_place(48.8566, 2.3522, sample_result("Paris"));

        // A nearby coordinate rounding to the same 5-decimal key.
        let hit = cache.get_place(48.856_601, 2.352_199).unwrap();
        assert_eq!(hit.city.as_deref(), Some("Paris"));
    }

    #[test]
    fn miss_falls_back_to_coarser_key() {
        // A coarser producer wrote a 4-decimal key into the file.
        let json = r#"{ "48.8584,2.2945": {
            "city": "Paris", "state": null, "country": "France",
            "place": "tour eiffel", "is_water": false
        }}"#;
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json).unwrap();
        let mut cache = GeoCache::new();
        for (key, value) in raw {
            cache
                .entries
                .insert(key, serde_json::from_value(value).unwrap());
        }

        // 5-decimal key "48.85837,2.29447" is absent; 4-decimal matches.
        let hit = cache.get_place(48.858_37, 2.294_47).unwrap();
        assert_eq!(hit.place_name, "tour eiffel");
    }

    #[test]
    fn namespaces_do_not_collide() {
        let mut cache = GeoCache::new();
        cache.put_place(10.0, 20.0, sample_result("Somewhere"));
        cache.put_water(10.0, 20.0, true);

        assert!(cache.get_place(10.0, 20.0).is_some());
        assert_eq!(cache.get_water(10.0, 20.0), Some(true));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn jump_keys_are_directional_pairs() {
        let mut cache = GeoCache::new();
        let from = (45.0, 13.0);
        let to = (45.5, 13.5);
        cache.put_jump_water(from, to, true);

        assert_eq!(cache.get_jump_water(from, to), Some(true));
        assert_eq!(cache.get_jump_water(to, from), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut cache = GeoCache::new();
        cache.put_place(48.8566, 2.3522, sample_result("Paris"));
        cache.put_water(45.0, 13.0, false);
        cache.put_jump_water((45.0, 13.0), (45.5, 13.5), true);

        let path = std::env::temp_dir().join(format!(
            "travel_map_cache_roundtrip_{}.json",
            std::process::id()
        ));
        cache.save(&path).unwrap();
        let reloaded = GeoCache::load(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(reloaded.len(), 3);
        assert_eq!(
            reloaded.get_place(48.8566, 2.3522),
            cache.get_place(48.8566, 2.3522)
        );
        assert_eq!(reloaded.get_water(45.0, 13.0), Some(false));
        assert_eq!(reloaded.get_jump_water((45.0, 13.0), (45.5, 13.5)), Some(true));
    }

    #[test]
    fn load_of_missing_file_is_empty() {
        let cache = GeoCache::load(Path::new("/nonexistent/geo_cache.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn load_skips_junk_entries_keeping_the_rest() {
        let json = r#"{
            "water:1.00000,2.00000": true,
            "3.00000,4.00000": { "city": "Pula", "place": "pula", "is_water": false },
            "junk": [1, 2, 3]
        }"#;
        let path = std::env::temp_dir().join(format!(
            "travel_map_cache_junk_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, json).unwrap();
        let cache = GeoCache::load(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_water(1.0, 2.0), Some(true));
        assert_eq!(cache.get_place(3.0, 4.0).unwrap().city.as_deref(), Some("Pula"));
    }
}
