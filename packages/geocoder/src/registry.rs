//! Compile-time registry of geocoding provider configurations.
//!
//! Each provider is defined in a TOML file under `services/`, embedded at
//! compile time. Endpoint URLs and pacing defaults live there rather than
//! in code so they can be reviewed and adjusted without touching the
//! client.

use serde::Deserialize;

/// A geocoding provider configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderService {
    /// Unique identifier (e.g. `"geoapify"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Reverse geocoding endpoint URL.
    pub base_url: String,
    /// Maximum coordinates per lookup batch.
    pub max_batch_size: usize,
    /// Maximum concurrent outstanding requests.
    pub max_concurrent_requests: usize,
    /// Delay between batches in milliseconds.
    pub batch_delay_ms: u64,
    /// Backoff before the single rate-limit retry, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("geoapify", include_str!("../services/geoapify.toml"))];

/// Returns all provider configurations.
///
/// # Panics
///
/// Panics if any embedded TOML config is malformed (this is a compile-time
/// guarantee since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<ProviderService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse geocoding provider '{name}': {e}"))
        })
        .collect()
}

/// Returns the default provider (the first registered one).
///
/// # Panics
///
/// Panics if the registry is empty or malformed (compile-time guarantee).
#[must_use]
pub fn default_service() -> ProviderService {
    all_services()
        .into_iter()
        .next()
        .unwrap_or_else(|| panic!("No geocoding providers registered"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_services() {
        let services = all_services();
        assert_eq!(services.len(), SERVICE_TOMLS.len());
    }

    #[test]
    fn default_service_has_sane_pacing() {
        let service = default_service();
        assert_eq!(service.id, "geoapify");
        assert!(!service.base_url.is_empty());
        assert!(service.max_batch_size > 0 && service.max_batch_size <= 25);
        assert!(service.max_concurrent_requests > 0);
        assert!(service.request_timeout_secs > 0);
    }
}
