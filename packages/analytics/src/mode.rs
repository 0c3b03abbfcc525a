//! Layered transport mode classification.
//!
//! A jump's mode is decided in four layers:
//!
//! 1. The raw source label maps to a coarse [`TransportMode`] through a
//!    fixed table.
//! 2. Trusted labels (Flight, Train, Ferry, Walking) are kept as-is.
//! 3. Untrusted labels go through geographic overrides in order:
//!    international short-or-long hops, coastal-country short hops, and a
//!    water check for mid-range distances (0.5–100 mi) through the
//!    per-jump cache.
//! 4. Sanity passes: implausibly fast surface travel becomes Flight, and
//!    Walking beyond small distance/time caps becomes Car.
//!
//! Every override is logged so a surprising mode in the jump report can be
//! traced. The ladder is deterministic given identical inputs and cache
//! state; only live water lookups introduce network variance, and those are
//! cached per jump pair.

use async_trait::async_trait;
use travel_map_analytics_models::TransportMode;
use travel_map_geocoder::GeocodeClient;

/// Countries where short unexplained hops are likely small-craft water
/// travel between islands and the mainland.
pub const COASTAL_COUNTRIES: &[&str] = &["Croatia", "Montenegro"];

/// Distance range (miles) that triggers a water check for untrusted modes.
const WATER_CHECK_RANGE_MILES: (f64, f64) = (0.5, 100.0);

/// Walking caps: beyond either, a Walking jump is reclassified to Car.
const WALKING_MAX_MILES: f64 = 2.0;
const WALKING_MAX_HOURS: f64 = 0.5;

/// Water-crossing oracle consulted for mid-range jumps.
///
/// Implemented by [`GeocodeClient`] (cache plus live lookups); tests
/// substitute fixed verdicts.
#[async_trait]
pub trait WaterProbe: Send + Sync {
    /// Whether the jump between two coordinates crosses open water.
    async fn is_over_water(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        distance_miles: f64,
        dest_place_name: &str,
    ) -> bool;
}

#[async_trait]
impl WaterProbe for GeocodeClient {
    async fn is_over_water(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        distance_miles: f64,
        dest_place_name: &str,
    ) -> bool {
        self.jump_over_water(from, to, distance_miles, dest_place_name)
            .await
    }
}

/// Everything the classifier knows about one jump.
#[derive(Debug, Clone)]
pub struct JumpContext<'a> {
    /// Departure coordinate.
    pub from: (f64, f64),
    /// Arrival coordinate.
    pub to: (f64, f64),
    /// Country of the departure place, if resolved.
    pub from_country: Option<&'a str>,
    /// Country of the arrival place, if resolved.
    pub to_country: Option<&'a str>,
    /// Provider place name of the arrival (lowercased).
    pub to_place_name: &'a str,
    /// Raw activity label attached to the arrival point.
    pub raw_mode: Option<&'a str>,
    /// Great-circle distance between the endpoints.
    pub distance_miles: f64,
    /// Elapsed time between the endpoints.
    pub duration_hours: f64,
}

/// Maps a raw source activity label to a coarse mode.
///
/// Labels are normalized (lowercase, underscores to spaces) so both export
/// dialects (`"in passenger vehicle"` and `"IN_PASSENGER_VEHICLE"`) hit the
/// same row. Unlisted labels are [`TransportMode::Unknown`].
#[must_use]
pub fn map_raw_mode(raw: &str) -> TransportMode {
    match normalize_label(raw).as_str() {
        "in train" | "in subway" | "in tram" => TransportMode::Train,
        "in passenger vehicle" | "fast mobility" | "medium mobility" => TransportMode::Car,
        "walking" | "slow mobility" | "stationary" => TransportMode::Walking,
        "in ferry" | "sailing" => TransportMode::Ferry,
        "flying" => TransportMode::Flight,
        _ => TransportMode::Unknown,
    }
}

fn normalize_label(raw: &str) -> String {
    raw.to_lowercase().replace('_', " ")
}

/// Classifies a jump's transport mode.
pub async fn classify(ctx: &JumpContext<'_>, water: &dyn WaterProbe) -> TransportMode {
    let raw = ctx.raw_mode.map_or_else(|| "unknown".to_string(), normalize_label);
    let mapped = map_raw_mode(&raw);

    let mut mode = if mapped.is_trusted() {
        log::debug!("Using source mode {mapped} (raw {raw:?})");
        mapped
    } else {
        apply_overrides(ctx, &raw, mapped, water).await
    };

    // Surface modes cannot cover long distances in minutes.
    if matches!(
        mode,
        TransportMode::Ferry | TransportMode::Car | TransportMode::Train
    ) && ctx.duration_hours < 0.5
        && ctx.distance_miles > 10.0
    {
        log::info!(
            "Overriding {mode} to Flight: {:.2} mi in {:.2} h",
            ctx.distance_miles,
            ctx.duration_hours
        );
        mode = TransportMode::Flight;
    }

    if mode == TransportMode::Walking
        && (ctx.distance_miles > WALKING_MAX_MILES || ctx.duration_hours > WALKING_MAX_HOURS)
    {
        log::info!(
            "Overriding Walking to Car: {:.2} mi in {:.2} h",
            ctx.distance_miles,
            ctx.duration_hours
        );
        mode = TransportMode::Car;
    }

    mode
}

async fn apply_overrides(
    ctx: &JumpContext<'_>,
    raw: &str,
    mapped: TransportMode,
    water: &dyn WaterProbe,
) -> TransportMode {
    let is_international = match (ctx.from_country, ctx.to_country) {
        (Some(from), Some(to)) => from != to && from != "Unknown" && to != "Unknown",
        _ => false,
    };
    let coastal = ctx
        .to_country
        .is_some_and(|country| COASTAL_COUNTRIES.contains(&country));

    if matches!(raw, "in passenger vehicle" | "unknown")
        && is_international
        && (ctx.distance_miles > 20.0 || ctx.duration_hours < 1.5)
    {
        log::info!(
            "Overriding mode to Flight: international jump {} -> {}, {:.2} mi in {:.2} h",
            ctx.from_country.unwrap_or("?"),
            ctx.to_country.unwrap_or("?"),
            ctx.distance_miles,
            ctx.duration_hours
        );
        return TransportMode::Flight;
    }

    if matches!(raw, "unknown" | "walking") && coastal && ctx.distance_miles < 2.0 {
        log::info!(
            "Overriding mode to Boat: short coastal-country jump ({:.2} mi)",
            ctx.distance_miles
        );
        return TransportMode::Boat;
    }

    let (min, max) = WATER_CHECK_RANGE_MILES;
    if ctx.distance_miles > min && ctx.distance_miles < max {
        let over_water = water
            .is_over_water(ctx.from, ctx.to, ctx.distance_miles, ctx.to_place_name)
            .await;

        if over_water || (coastal && ctx.distance_miles < 2.0) {
            let mode = if ctx.distance_miles > 2.0 {
                TransportMode::Ferry
            } else {
                TransportMode::Boat
            };
            log::info!("Overriding mode to {mode}: water detected along jump");
            return mode;
        }
        if coastal && ctx.distance_miles > 2.0 && !ctx.to_place_name.contains("inland") {
            log::info!("Overriding mode to Ferry: coastal-country context");
            return TransportMode::Ferry;
        }
        if ctx.distance_miles > 2.0 {
            log::info!(
                "Overriding mode to Car: {:.2} mi over land",
                ctx.distance_miles
            );
            return TransportMode::Car;
        }
        log::info!("Defaulting mode to Walking for short land jump");
        return TransportMode::Walking;
    }

    mapped
}
