//! Core ski trip analytics library implemented in Rust.
//!
//! Turns a raw, timestamp-keyed GPS log into ordered GPS points, summary
//! metrics and the derived performance, slope and altitude analyses.

pub mod altitude;
pub mod format;
pub mod performance;
pub mod profile;
pub mod raw;
pub mod slope;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

pub use altitude::{calculate_altitude_analysis, AltitudeAnalysis, ElevationZone, ElevationZones};
pub use performance::{
    calculate_performance_metrics, PerformanceMetrics, SpeedZone, SpeedZones, Zone, ZoneKind,
};
pub use profile::Activity;
pub use raw::{RawGps, RawLog, RawLogEntry};
pub use slope::{calculate_slope_analysis, Difficulty, Run, Segment, SlopeAnalysis, SlopeDifficulty};

pub const DEFAULT_GPS_ACCURACY_THRESHOLD_M: f64 = 50.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Error, Debug)]
pub enum TripError {
    #[error("trip data is empty")]
    EmptyInput,
    #[error("invalid JSON format in trip data: {0}")]
    InvalidJson(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Points reporting a horizontal accuracy worse than this are dropped.
    pub gps_accuracy_threshold_m: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gps_accuracy_threshold_m: DEFAULT_GPS_ACCURACY_THRESHOLD_M,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsPoint {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
    pub speed: f64,
    pub accuracy: f64,
    pub course: f64,
}

impl GpsPoint {
    fn from_raw(timestamp: i64, gps: &RawGps, accuracy_threshold_m: f64) -> Option<Self> {
        let lat = gps.latitude?;
        let lng = gps.longitude?;
        let altitude = gps.altitude?;
        let speed = gps.speed?;
        if gps
            .horizontal_accuracy
            .is_some_and(|accuracy| accuracy > accuracy_threshold_m)
        {
            return None;
        }
        Some(Self {
            timestamp,
            lat,
            lng,
            altitude,
            speed,
            accuracy: gps.horizontal_accuracy.unwrap_or(0.0),
            course: gps.course.unwrap_or(0.0),
        })
    }

    pub fn distance_to(&self, other: &GpsPoint) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_distance: f64,
    pub max_speed: f64,
    pub vertical_drop: f64,
    pub duration: f64,
    pub max_altitude: f64,
    pub min_altitude: f64,
    pub average_speed: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTripData {
    pub gps_points: Vec<GpsPoint>,
    pub polyline: Vec<[f64; 2]>,
    pub metrics: Metrics,
    pub max_speed_point: Option<GpsPoint>,
    pub start_point: Option<GpsPoint>,
    pub end_point: Option<GpsPoint>,
}

impl ParsedTripData {
    pub fn is_empty(&self) -> bool {
        self.gps_points.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripAnalysis {
    #[serde(flatten)]
    pub trip: ParsedTripData,
    pub performance_metrics: PerformanceMetrics,
    pub slope_analysis: SlopeAnalysis,
    pub altitude_analysis: AltitudeAnalysis,
}

/// Parse a raw trip log (a JSON object keyed by millisecond timestamps).
///
/// Never fails: anything that is not an object, or that holds no usable GPS
/// samples, produces the empty result.
pub fn parse_trip_data(raw: &JsonValue, config: &AnalysisConfig) -> ParsedTripData {
    match RawLog::from_value(raw) {
        Some(log) => parse_raw_log(&log, config),
        None => {
            debug!("raw trip log is not an object; returning empty trip");
            ParsedTripData::default()
        }
    }
}

pub fn parse_raw_log(log: &RawLog, config: &AnalysisConfig) -> ParsedTripData {
    let gps_points = extract_gps_points(log, config);
    debug!(
        entries = log.len(),
        kept = gps_points.len(),
        threshold_m = config.gps_accuracy_threshold_m,
        "extracted GPS points"
    );
    if gps_points.is_empty() {
        return ParsedTripData::default();
    }

    let metrics = compute_metrics(&gps_points);
    let max_speed_point = max_speed_point(&gps_points).cloned();
    let polyline = gps_points.iter().map(|p| [p.lat, p.lng]).collect();
    let start_point = gps_points.first().cloned();
    let end_point = gps_points.last().cloned();

    ParsedTripData {
        gps_points,
        polyline,
        metrics,
        max_speed_point,
        start_point,
        end_point,
    }
}

/// Keep the entries with a complete, accurate enough GPS block, ordered by
/// timestamp. Ties keep their log order.
pub fn extract_gps_points(log: &RawLog, config: &AnalysisConfig) -> Vec<GpsPoint> {
    let mut points: Vec<GpsPoint> = log
        .entries()
        .iter()
        .filter_map(|(key, entry)| {
            let gps = entry.gps.as_ref()?;
            let timestamp = raw::parse_timestamp_key(key)?;
            GpsPoint::from_raw(timestamp, gps, config.gps_accuracy_threshold_m)
        })
        .collect();
    points.sort_by_key(|p| p.timestamp);
    points
}

pub fn compute_metrics(points: &[GpsPoint]) -> Metrics {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Metrics::default();
    };

    let mut max_speed = f64::NEG_INFINITY;
    let mut max_altitude = f64::NEG_INFINITY;
    let mut min_altitude = f64::INFINITY;
    let mut speed_sum = 0.0;
    for p in points {
        max_speed = max_speed.max(p.speed);
        max_altitude = max_altitude.max(p.altitude);
        min_altitude = min_altitude.min(p.altitude);
        speed_sum += p.speed;
    }

    let total_distance = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();

    Metrics {
        total_distance,
        max_speed,
        vertical_drop: max_altitude - min_altitude,
        duration: elapsed_s(first, last),
        max_altitude,
        min_altitude,
        average_speed: speed_sum / points.len() as f64,
    }
}

/// Fastest point; the earliest one wins a tie.
pub fn max_speed_point(points: &[GpsPoint]) -> Option<&GpsPoint> {
    points.iter().fold(None, |best, p| match best {
        Some(b) if p.speed <= b.speed => Some(b),
        _ => Some(p),
    })
}

/// Run every stage over the same raw log.
pub fn analyze_trip(raw: &JsonValue, config: &AnalysisConfig) -> TripAnalysis {
    let trip = parse_trip_data(raw, config);
    let points = &trip.gps_points;
    let performance_metrics = calculate_performance_metrics(points);
    let slope_analysis = calculate_slope_analysis(points);
    let altitude_analysis = calculate_altitude_analysis(points);
    debug!(
        points = points.len(),
        runs = slope_analysis.total_runs,
        acceleration_zones = performance_metrics.acceleration_zones.len(),
        "trip analysis complete"
    );
    TripAnalysis {
        trip,
        performance_metrics,
        slope_analysis,
        altitude_analysis,
    }
}

/// Parse trip JSON text and analyze it. Only unreadable text is an error;
/// readable but useless logs come back as the empty analysis.
pub fn parse_trip_json(text: &str, config: &AnalysisConfig) -> Result<TripAnalysis, TripError> {
    if text.trim().is_empty() {
        return Err(TripError::EmptyInput);
    }
    let raw: JsonValue =
        serde_json::from_str(text).map_err(|e| TripError::InvalidJson(e.to_string()))?;
    Ok(analyze_trip(&raw, config))
}

/// Great-circle distance in meters between two lat/lon pairs in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let to_rad = |deg: f64| deg.to_radians();
    let dlat = to_rad(lat2 - lat1);
    let dlon = to_rad(lon2 - lon1);
    let a = (dlat / 2.0).sin().powi(2)
        + to_rad(lat1).cos() * to_rad(lat2).cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c * 1000.0
}

/// Seconds between two points.
pub(crate) fn elapsed_s(from: &GpsPoint, to: &GpsPoint) -> f64 {
    (to.timestamp as f64 - from.timestamp as f64) / 1000.0
}

#[cfg(test)]
pub(crate) fn test_point(timestamp: i64, lat: f64, altitude: f64, speed: f64) -> GpsPoint {
    GpsPoint {
        timestamp,
        lat,
        lng: 11.0,
        altitude,
        speed,
        accuracy: 0.0,
        course: 0.0,
    }
}
