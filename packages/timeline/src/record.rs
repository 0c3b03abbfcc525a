//! Tagged classification of raw timeline records.
//!
//! Exports from different app generations mix record shapes freely in one
//! file, and numeric fields arrive as either JSON numbers or strings. Every
//! record is first deserialized into the permissive [`RawRecord`] and then
//! classified into exactly one [`TimelineRecord`] variant before any field
//! is interpreted, so shape-sniffing never happens mid-extraction.

use serde::Deserialize;

/// A JSON value that is numeric in meaning but may be encoded as a string.
///
/// Exports stringify offsets, probabilities, and epoch timestamps
/// inconsistently across generations (`"durationMinutesOffsetFromStartTime":
/// "5"` vs `5`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    /// Plain JSON number.
    Number(f64),
    /// Number encoded as a string.
    Text(String),
}

impl RawNumber {
    /// The numeric value, if the text form parses.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A timeline record as it appears in the export, all fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRecord {
    /// Record start instant (RFC 3339).
    pub start_time: Option<String>,
    /// Record end instant (RFC 3339).
    pub end_time: Option<String>,
    /// Activity segment body.
    pub activity: Option<RawActivity>,
    /// Place visit body.
    pub visit: Option<RawVisit>,
    /// Ordered waypoint list.
    pub timeline_path: Option<Vec<RawPathPoint>>,
    /// Legacy epoch timestamp (milliseconds or seconds).
    pub timestamp_ms: Option<RawNumber>,
    /// Legacy E7-scaled latitude.
    pub latitude_e7: Option<i64>,
    /// Legacy E7-scaled longitude.
    pub longitude_e7: Option<i64>,
    /// Legacy decimal latitude.
    pub latitude: Option<f64>,
    /// Legacy decimal longitude.
    pub longitude: Option<f64>,
}

/// Body of an activity segment record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawActivity {
    /// Start coordinate as a `geo:<lat>,<lon>` string.
    pub start: Option<String>,
    /// End coordinate as a `geo:<lat>,<lon>` string.
    pub end: Option<String>,
    /// Traveled distance in meters.
    pub distance_meters: Option<RawNumber>,
    /// Most probable activity candidate.
    pub top_candidate: Option<RawTopCandidate>,
}

/// Body of a place visit record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawVisit {
    /// Most probable place candidate.
    pub top_candidate: Option<RawTopCandidate>,
    /// Visit confidence in `[0, 1]`.
    pub probability: Option<RawNumber>,
}

/// The `topCandidate` object nested in activities and visits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTopCandidate {
    /// Activity type label (e.g. `"in passenger vehicle"`).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Visit location as a `geo:<lat>,<lon>` string.
    pub place_location: Option<String>,
}

/// A single waypoint inside a `timelinePath` record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPathPoint {
    /// Coordinate as a `geo:<lat>,<lon>` string.
    pub point: Option<String>,
    /// Minutes elapsed since the record's `startTime`.
    pub duration_minutes_offset_from_start_time: Option<RawNumber>,
    /// Movement mode label for this waypoint.
    pub mode: Option<String>,
}

/// A raw record resolved to exactly one shape.
///
/// Shapes are tried in priority order — activity, visit, path, legacy point
/// — and the first match wins; a record carrying several shape keys is
/// treated as the highest-priority one.
#[derive(Debug, Clone)]
pub enum TimelineRecord {
    /// Movement segment with start/end endpoints.
    Activity(RawRecord),
    /// Stay at a single place.
    Visit(RawRecord),
    /// Ordered waypoint trace.
    Path(RawRecord),
    /// Flat single-point record from the oldest export dialect.
    LegacyPoint(RawRecord),
    /// None of the known shapes.
    Unrecognized,
}

impl TimelineRecord {
    /// Classifies a raw record by shape-key presence.
    #[must_use]
    pub fn classify(raw: RawRecord) -> Self {
        if raw.activity.is_some() {
            Self::Activity(raw)
        } else if raw.visit.is_some() {
            Self::Visit(raw)
        } else if raw.timeline_path.is_some() {
            Self::Path(raw)
        } else if raw.timestamp_ms.is_some() {
            Self::LegacyPoint(raw)
        } else {
            Self::Unrecognized
        }
    }
}

/// Parses a `geo:<lat>,<lon>` coordinate string.
///
/// Exactly two comma-separated floats are required, and the pair must be a
/// plausible WGS84 coordinate (|lat| <= 90, |lon| <= 180). Anything else is
/// `None` — callers drop the point and count it, never fail.
#[must_use]
pub fn parse_geo_string(value: &str) -> Option<(f64, f64)> {
    let rest = value.strip_prefix("geo:")?;
    let mut parts = rest.split(',');
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let lon: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    (lat.abs() <= 90.0 && lon.abs() <= 180.0).then_some((lat, lon))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn geo_string_round_trips_exact_floats() {
        let cases = [
            (48.8566, 2.3522),
            (-33.8688, 151.2093),
            (0.0, 0.0),
            (90.0, 180.0),
            (-90.0, -180.0),
        ];
        for (lat, lon) in cases {
            let parsed = parse_geo_string(&format!("geo:{lat},{lon}")).unwrap();
            assert_eq!(parsed, (lat, lon));
        }
    }

    #[test]
    fn geo_string_rejects_malformed_input() {
        assert!(parse_geo_string("48.85,2.35").is_none());
        assert!(parse_geo_string("geo:48.85").is_none());
        assert!(parse_geo_string("geo:48.85,2.35,12").is_none());
        assert!(parse_geo_string("geo:north,south").is_none());
    }

    #[test]
    fn geo_string_rejects_out_of_range_coordinates() {
        assert!(parse_geo_string("geo:91.0,2.35").is_none());
        assert!(parse_geo_string("geo:-90.1,2.35").is_none());
        assert!(parse_geo_string("geo:48.85,180.5").is_none());
    }

    #[test]
    fn classify_prefers_activity_over_other_shapes() {
        let raw: RawRecord = serde_json::from_value(json!({
            "startTime": "2024-01-01T10:00:00Z",
            "activity": { "start": "geo:1.0,2.0" },
            "timelinePath": []
        }))
        .unwrap();
        assert!(matches!(
            TimelineRecord::classify(raw),
            TimelineRecord::Activity(_)
        ));
    }

    #[test]
    fn classify_detects_legacy_point_by_timestamp_ms() {
        let raw: RawRecord = serde_json::from_value(json!({
            "timestampMs": "1389468129547",
            "latitudeE7": 488_566_000i64,
            "longitudeE7": 23_522_000i64
        }))
        .unwrap();
        assert!(matches!(
            TimelineRecord::classify(raw),
            TimelineRecord::LegacyPoint(_)
        ));
    }

    #[test]
    fn classify_flags_unknown_shapes() {
        let raw: RawRecord = serde_json::from_value(json!({
            "wifiScan": { "accessPoints": [] }
        }))
        .unwrap();
        assert!(matches!(
            TimelineRecord::classify(raw),
            TimelineRecord::Unrecognized
        ));
    }

    #[test]
    fn raw_number_accepts_both_encodings() {
        let nums: Vec<RawNumber> = serde_json::from_value(json!([5, "5", 5.5, "5.5"])).unwrap();
        let values: Vec<f64> = nums.iter().filter_map(RawNumber::as_f64).collect();
        assert_eq!(values, vec![5.0, 5.0, 5.5, 5.5]);
    }
}
