use serde::{Deserialize, Serialize};

use crate::{elapsed_s, GpsPoint};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ElevationZone {
    Bottom,
    Lower,
    Upper,
    Top,
}

impl ElevationZone {
    /// Quartile of a relative altitude in `[0, 1]`.
    pub fn from_relative(relative: f64) -> Self {
        match relative {
            r if r < 0.25 => ElevationZone::Bottom,
            r if r < 0.5 => ElevationZone::Lower,
            r if r < 0.75 => ElevationZone::Upper,
            _ => ElevationZone::Top,
        }
    }

    /// Zone of `altitude` within `[min, min + range]`. A flat track has a
    /// single level and sits entirely in the bottom zone.
    pub fn locate(altitude: f64, min_altitude: f64, range: f64) -> Self {
        if range <= 0.0 {
            return ElevationZone::Bottom;
        }
        Self::from_relative((altitude - min_altitude) / range)
    }
}

/// Seconds spent in each altitude quartile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationZones {
    pub bottom: f64,
    pub lower: f64,
    pub upper: f64,
    pub top: f64,
}

impl ElevationZones {
    pub fn add(&mut self, zone: ElevationZone, seconds: f64) {
        let slot = match zone {
            ElevationZone::Bottom => &mut self.bottom,
            ElevationZone::Lower => &mut self.lower,
            ElevationZone::Upper => &mut self.upper,
            ElevationZone::Top => &mut self.top,
        };
        *slot += seconds;
    }

    pub fn total(&self) -> f64 {
        self.bottom + self.lower + self.upper + self.top
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AltitudeAnalysis {
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub altitude_range: f64,
    pub ascent_time: f64,
    pub descent_time: f64,
    /// Peak climb rate, m/s.
    pub max_ascent_rate: f64,
    /// Peak descent rate as a positive value, m/s.
    pub max_descent_rate: f64,
    pub elevation_zones: ElevationZones,
}

pub fn calculate_altitude_analysis(points: &[GpsPoint]) -> AltitudeAnalysis {
    if points.len() < 2 {
        return AltitudeAnalysis::default();
    }

    let (min_altitude, max_altitude) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), p| (lo.min(p.altitude), hi.max(p.altitude)),
    );
    let altitude_range = max_altitude - min_altitude;

    let mut analysis = AltitudeAnalysis {
        min_altitude,
        max_altitude,
        altitude_range,
        ..AltitudeAnalysis::default()
    };

    for pair in points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let dt = elapsed_s(prev, curr);
        let change = curr.altitude - prev.altitude;
        let rate = if dt > 0.0 { change.abs() / dt } else { 0.0 };

        if change > 0.0 {
            analysis.ascent_time += dt;
            analysis.max_ascent_rate = analysis.max_ascent_rate.max(rate);
        } else if change < 0.0 {
            analysis.descent_time += dt;
            analysis.max_descent_rate = analysis.max_descent_rate.max(rate);
        }

        let zone = ElevationZone::locate(curr.altitude, min_altitude, altitude_range);
        analysis.elevation_zones.add(zone, dt);
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_point;

    #[test]
    fn ascent_and_descent_rates() {
        let points = vec![
            test_point(0, 47.0, 1000.0, 1.0),
            test_point(10_000, 47.0, 1020.0, 1.0),
            test_point(20_000, 47.0, 1050.0, 1.0),
            test_point(30_000, 47.0, 1050.0, 1.0),
            test_point(35_000, 47.0, 1000.0, 12.0),
        ];
        let analysis = calculate_altitude_analysis(&points);
        assert_eq!(analysis.min_altitude, 1000.0);
        assert_eq!(analysis.max_altitude, 1050.0);
        assert_eq!(analysis.altitude_range, 50.0);
        assert_eq!(analysis.ascent_time, 20.0);
        assert_eq!(analysis.descent_time, 5.0);
        assert_eq!(analysis.max_ascent_rate, 3.0);
        assert_eq!(analysis.max_descent_rate, 10.0);
    }

    #[test]
    fn elevation_zones_use_later_point() {
        let points = vec![
            test_point(0, 47.0, 1000.0, 1.0),
            test_point(10_000, 47.0, 1100.0, 1.0),
            test_point(30_000, 47.0, 1060.0, 1.0),
            test_point(60_000, 47.0, 1030.0, 1.0),
            test_point(100_000, 47.0, 1000.0, 1.0),
        ];
        let zones = calculate_altitude_analysis(&points).elevation_zones;
        assert_eq!(zones.top, 10.0);
        assert_eq!(zones.upper, 20.0);
        assert_eq!(zones.lower, 30.0);
        assert_eq!(zones.bottom, 40.0);
        assert_eq!(zones.total(), 100.0);
    }

    #[test]
    fn flat_track_sits_in_bottom_zone() {
        let points = vec![
            test_point(0, 47.0, 1500.0, 1.0),
            test_point(4_000, 47.0, 1500.0, 1.0),
            test_point(9_000, 47.0, 1500.0, 1.0),
        ];
        let analysis = calculate_altitude_analysis(&points);
        assert_eq!(analysis.altitude_range, 0.0);
        assert_eq!(analysis.elevation_zones.bottom, 9.0);
        assert_eq!(analysis.ascent_time + analysis.descent_time, 0.0);
    }

    #[test]
    fn zero_interval_has_no_rate() {
        let points = vec![
            test_point(1_000, 47.0, 1500.0, 1.0),
            test_point(1_000, 47.0, 1400.0, 1.0),
        ];
        let analysis = calculate_altitude_analysis(&points);
        assert_eq!(analysis.max_descent_rate, 0.0);
        assert_eq!(analysis.descent_time, 0.0);
    }

    #[test]
    fn too_few_points() {
        assert_eq!(calculate_altitude_analysis(&[]), AltitudeAnalysis::default());
    }
}
