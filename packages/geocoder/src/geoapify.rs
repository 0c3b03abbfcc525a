//! Geoapify reverse geocoder client.
//!
//! One coordinate per request against the `/v1/geocode/reverse` endpoint in
//! `geojson` format. The caller controls concurrency and inter-batch
//! pacing; HTTP 429 surfaces as [`GeocodeError::RateLimited`] so the retry
//! layer can back off.
//!
//! See <https://apidocs.geoapify.com/docs/geocoding/reverse-geocoding/>

use std::time::Duration;

use crate::{GeocodeError, GeocodeResult};

/// Place-name fragments that classify a result as water regardless of the
/// provider's category fields.
pub const WATER_NAME_TOKENS: &[&str] = &["waters", "sea", "ocean", "bay", "channel"];

/// Returns `true` if a lowercased place name contains a water token.
#[must_use]
pub fn has_water_token(place_name: &str) -> bool {
    WATER_NAME_TOKENS
        .iter()
        .any(|token| place_name.contains(token))
}

/// Reverse-geocodes a single coordinate.
///
/// # Errors
///
/// Returns [`GeocodeError::RateLimited`] on HTTP 429, and [`GeocodeError`]
/// for other HTTP failures, timeouts, or unparseable responses.
pub async fn reverse_geocode(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    lat: f64,
    lon: f64,
    timeout: Duration,
) -> Result<GeocodeResult, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("apiKey", api_key.to_string()),
            ("format", "geojson".to_string()),
        ])
        .timeout(timeout)
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    if !resp.status().is_success() {
        return Err(GeocodeError::Parse {
            message: format!("Geoapify returned status {}", resp.status()),
        });
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses a Geoapify `GeoJSON` `FeatureCollection` response.
///
/// An empty feature list means the provider knows nothing about the
/// coordinate — open water.
fn parse_response(body: &serde_json::Value) -> Result<GeocodeResult, GeocodeError> {
    let features = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Geoapify response missing 'features' array".to_string(),
        })?;

    let Some(first) = features.first() else {
        return Ok(GeocodeResult::open_water());
    };

    let prop_str = |name: &str| {
        first
            .pointer(&format!("/properties/{name}"))
            .and_then(serde_json::Value::as_str)
            .map(String::from)
    };

    let place_name = prop_str("name").unwrap_or_default().to_lowercase();
    let city = prop_str("city").or_else(|| prop_str("county"));
    let state = prop_str("state");
    let country = prop_str("country");

    let natural_water = prop_str("category").as_deref() == Some("natural")
        && prop_str("class").as_deref() == Some("water");
    let is_water = natural_water || has_water_token(&place_name);

    Ok(GeocodeResult {
        city,
        state,
        country,
        place_name,
        is_water,
    })
}
