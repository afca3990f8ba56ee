use serde::{Deserialize, Serialize};

use crate::profile::Activity;
use crate::{elapsed_s, GpsPoint};

/// Centered acceleration (m/s²) beyond which a point belongs to a zone.
pub const ACCELERATION_THRESHOLD_MPS2: f64 = 1.0;
/// Zones covering fewer points than this are discarded.
pub const MIN_ZONE_POINTS: usize = 3;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ZoneKind {
    Acceleration,
    Deceleration,
}

impl ZoneKind {
    fn classify(acceleration: f64) -> Option<Self> {
        if acceleration > ACCELERATION_THRESHOLD_MPS2 {
            Some(ZoneKind::Acceleration)
        } else if acceleration < -ACCELERATION_THRESHOLD_MPS2 {
            Some(ZoneKind::Deceleration)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub kind: ZoneKind,
    pub start_index: usize,
    pub end_index: usize,
    /// Largest acceleration for acceleration zones, most negative for
    /// deceleration zones.
    pub peak_acceleration: f64,
    pub start_speed: f64,
    pub end_speed: f64,
}

impl Zone {
    fn open(kind: ZoneKind, index: usize, acceleration: f64, speed: f64) -> Self {
        Self {
            kind,
            start_index: index,
            end_index: index,
            peak_acceleration: acceleration,
            start_speed: speed,
            end_speed: speed,
        }
    }

    fn extend(&mut self, index: usize, acceleration: f64, speed: f64) {
        self.end_index = index;
        self.end_speed = speed;
        self.peak_acceleration = match self.kind {
            ZoneKind::Acceleration => self.peak_acceleration.max(acceleration),
            ZoneKind::Deceleration => self.peak_acceleration.min(acceleration),
        };
    }

    /// Number of points covered, both ends inclusive.
    pub fn span(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SpeedZone {
    Stationary,
    Slow,
    Moderate,
    Fast,
    VeryFast,
}

impl SpeedZone {
    /// Bin a speed in m/s. Negative speeds (invalid fixes) count as stationary.
    pub fn from_speed(speed: f64) -> Self {
        match speed {
            s if s < 0.5 => SpeedZone::Stationary,
            s if s < 2.0 => SpeedZone::Slow,
            s if s < 5.0 => SpeedZone::Moderate,
            s if s < 10.0 => SpeedZone::Fast,
            _ => SpeedZone::VeryFast,
        }
    }
}

/// Seconds spent in each speed band.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedZones {
    pub stationary: f64,
    pub slow: f64,
    pub moderate: f64,
    pub fast: f64,
    pub very_fast: f64,
}

impl SpeedZones {
    pub fn add(&mut self, zone: SpeedZone, seconds: f64) {
        let slot = match zone {
            SpeedZone::Stationary => &mut self.stationary,
            SpeedZone::Slow => &mut self.slow,
            SpeedZone::Moderate => &mut self.moderate,
            SpeedZone::Fast => &mut self.fast,
            SpeedZone::VeryFast => &mut self.very_fast,
        };
        *slot += seconds;
    }

    pub fn total(&self) -> f64 {
        self.stationary + self.slow + self.moderate + self.fast + self.very_fast
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Population standard deviation of speed, m/s.
    pub speed_consistency: f64,
    pub acceleration_zones: Vec<Zone>,
    pub deceleration_zones: Vec<Zone>,
    pub skiing_time: f64,
    pub lift_time: f64,
    pub stopped_time: f64,
    pub speed_zones: SpeedZones,
}

pub fn calculate_performance_metrics(points: &[GpsPoint]) -> PerformanceMetrics {
    if points.len() < 2 {
        return PerformanceMetrics::default();
    }

    let mut metrics = PerformanceMetrics {
        speed_consistency: speed_std_dev(points),
        ..PerformanceMetrics::default()
    };

    let (acceleration_zones, deceleration_zones): (Vec<Zone>, Vec<Zone>) = detect_zones(points)
        .into_iter()
        .partition(|z| z.kind == ZoneKind::Acceleration);
    metrics.acceleration_zones = acceleration_zones;
    metrics.deceleration_zones = deceleration_zones;

    for pair in points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let dt = elapsed_s(prev, curr);
        let average_speed = (prev.speed + curr.speed) / 2.0;
        match Activity::for_pair(average_speed, curr.altitude > prev.altitude) {
            Activity::Stationary => metrics.stopped_time += dt,
            Activity::Lift => metrics.lift_time += dt,
            Activity::Skiing => metrics.skiing_time += dt,
        }
        metrics
            .speed_zones
            .add(SpeedZone::from_speed(average_speed), dt);
    }

    metrics
}

fn speed_std_dev(points: &[GpsPoint]) -> f64 {
    let n = points.len() as f64;
    let mean = points.iter().map(|p| p.speed).sum::<f64>() / n;
    let variance = points
        .iter()
        .map(|p| (p.speed - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt()
}

/// Average of the backward and forward accelerations around `curr`.
/// `None` when either interval is not positive.
fn centered_acceleration(prev: &GpsPoint, curr: &GpsPoint, next: &GpsPoint) -> Option<f64> {
    let dt_in = elapsed_s(prev, curr);
    let dt_out = elapsed_s(curr, next);
    if dt_in <= 0.0 || dt_out <= 0.0 {
        return None;
    }
    let a_in = (curr.speed - prev.speed) / dt_in;
    let a_out = (next.speed - curr.speed) / dt_out;
    Some((a_in + a_out) / 2.0)
}

fn detect_zones(points: &[GpsPoint]) -> Vec<Zone> {
    let mut zones = Vec::new();
    let mut open: Option<Zone> = None;

    for i in 1..points.len().saturating_sub(1) {
        let sample = centered_acceleration(&points[i - 1], &points[i], &points[i + 1])
            .and_then(|a| ZoneKind::classify(a).map(|kind| (kind, a)));
        let speed = points[i].speed;
        match sample {
            Some((kind, accel)) if open.as_ref().is_some_and(|z| z.kind == kind) => {
                if let Some(zone) = open.as_mut() {
                    zone.extend(i, accel, speed);
                }
            }
            _ => {
                zones.extend(open.take());
                open = sample.map(|(kind, accel)| Zone::open(kind, i, accel, speed));
            }
        }
    }
    zones.extend(open);

    zones.retain(|z| z.span() >= MIN_ZONE_POINTS);
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_point;

    fn series(speeds: &[f64]) -> Vec<GpsPoint> {
        speeds
            .iter()
            .enumerate()
            .map(|(i, &s)| test_point(i as i64 * 1000, 47.0, 2000.0 - i as f64, s))
            .collect()
    }

    #[test]
    fn fewer_than_two_points_is_zeroed() {
        assert_eq!(calculate_performance_metrics(&[]), PerformanceMetrics::default());
        let one = series(&[4.0]);
        assert_eq!(calculate_performance_metrics(&one), PerformanceMetrics::default());
    }

    #[test]
    fn speed_consistency_is_population_std_dev() {
        let metrics = calculate_performance_metrics(&series(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]));
        assert!((metrics.speed_consistency - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sustained_acceleration_forms_one_zone() {
        let metrics = calculate_performance_metrics(&series(&[0.0, 2.0, 4.0, 6.0, 8.0, 8.0, 8.0]));
        assert_eq!(metrics.acceleration_zones.len(), 1);
        let zone = &metrics.acceleration_zones[0];
        assert_eq!((zone.start_index, zone.end_index), (1, 3));
        assert_eq!(zone.peak_acceleration, 2.0);
        assert_eq!(zone.start_speed, 2.0);
        assert_eq!(zone.end_speed, 6.0);
        assert!(metrics.deceleration_zones.is_empty());
    }

    #[test]
    fn short_zones_are_dropped() {
        // Only points 1 and 2 exceed the threshold.
        let metrics = calculate_performance_metrics(&series(&[0.0, 3.0, 6.0, 6.0, 6.0]));
        assert!(metrics.acceleration_zones.is_empty());
    }

    #[test]
    fn deceleration_tracks_most_negative_value() {
        let metrics = calculate_performance_metrics(&series(&[12.0, 12.0, 9.0, 5.0, 2.0, 0.0, 0.0]));
        assert_eq!(metrics.deceleration_zones.len(), 1);
        let zone = &metrics.deceleration_zones[0];
        assert_eq!((zone.start_index, zone.end_index), (1, 4));
        assert_eq!(zone.peak_acceleration, -3.5);
        assert_eq!(zone.end_speed, 2.0);
        assert!(metrics.acceleration_zones.is_empty());
    }

    #[test]
    fn acceleration_then_deceleration_gives_two_zones() {
        let metrics =
            calculate_performance_metrics(&series(&[0.0, 2.0, 4.0, 6.0, 8.0, 6.0, 4.0, 2.0, 0.0]));
        assert_eq!(metrics.acceleration_zones.len(), 1);
        assert_eq!(metrics.deceleration_zones.len(), 1);
        let accel = &metrics.acceleration_zones[0];
        let decel = &metrics.deceleration_zones[0];
        assert_eq!((accel.start_index, accel.end_index), (1, 3));
        assert_eq!((decel.start_index, decel.end_index), (5, 7));
        assert_eq!((decel.start_speed, decel.end_speed), (6.0, 2.0));
    }

    #[test]
    fn change_of_kind_closes_zone() {
        // Point 3 still accelerates and point 4 already brakes.
        let metrics =
            calculate_performance_metrics(&series(&[0.0, 4.0, 8.0, 12.0, 11.0, 7.0, 3.0, 0.0]));
        let accel = &metrics.acceleration_zones;
        let decel = &metrics.deceleration_zones;
        assert_eq!(accel.len(), 1);
        assert_eq!(decel.len(), 1);
        assert_eq!((accel[0].start_index, accel[0].end_index), (1, 3));
        assert_eq!((accel[0].start_speed, accel[0].end_speed), (4.0, 12.0));
        assert_eq!((decel[0].start_index, decel[0].end_index), (4, 6));
        assert_eq!(decel[0].peak_acceleration, -4.0);
        assert_eq!((decel[0].start_speed, decel[0].end_speed), (11.0, 3.0));
    }

    #[test]
    fn flat_point_splits_acceleration() {
        // Point 4 averages exactly the threshold and does not qualify.
        let metrics = calculate_performance_metrics(&series(&[
            0.0, 4.0, 8.0, 12.0, 12.0, 14.0, 18.0, 22.0, 26.0,
        ]));
        let ranges: Vec<(usize, usize)> = metrics
            .acceleration_zones
            .iter()
            .map(|z| (z.start_index, z.end_index))
            .collect();
        assert_eq!(ranges, vec![(1, 3), (5, 7)]);
        assert_eq!(metrics.acceleration_zones[1].start_speed, 14.0);
        assert!(metrics.deceleration_zones.is_empty());
    }

    #[test]
    fn duplicate_timestamps_do_not_qualify() {
        let mut points = series(&[0.0, 2.0, 4.0, 6.0, 8.0]);
        points[2].timestamp = points[1].timestamp;
        let metrics = calculate_performance_metrics(&points);
        assert!(metrics.acceleration_zones.is_empty());
    }

    #[test]
    fn activity_time_splits_duration() {
        let points = vec![
            test_point(0, 47.0, 1000.0, 0.0),
            test_point(10_000, 47.0, 1000.0, 0.2),
            test_point(20_000, 47.0, 1050.0, 1.5),
            test_point(30_000, 47.0, 1100.0, 1.5),
            test_point(40_000, 47.0, 1090.0, 1.5),
            test_point(55_000, 47.0, 1000.0, 12.0),
        ];
        let metrics = calculate_performance_metrics(&points);
        assert_eq!(metrics.stopped_time, 10.0);
        assert_eq!(metrics.lift_time, 20.0);
        assert_eq!(metrics.skiing_time, 25.0);
        let total = metrics.stopped_time + metrics.lift_time + metrics.skiing_time;
        assert!((total - 55.0).abs() < 1e-9);

        assert_eq!(metrics.speed_zones.stationary, 10.0);
        assert_eq!(metrics.speed_zones.slow, 30.0);
        assert_eq!(metrics.speed_zones.fast, 15.0);
        assert!((metrics.speed_zones.total() - 55.0).abs() < 1e-9);
    }

    #[test]
    fn speed_zone_boundaries() {
        assert_eq!(SpeedZone::from_speed(-1.0), SpeedZone::Stationary);
        assert_eq!(SpeedZone::from_speed(0.5), SpeedZone::Slow);
        assert_eq!(SpeedZone::from_speed(2.0), SpeedZone::Moderate);
        assert_eq!(SpeedZone::from_speed(5.0), SpeedZone::Fast);
        assert_eq!(SpeedZone::from_speed(10.0), SpeedZone::VeryFast);
    }
}
