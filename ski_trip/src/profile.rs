//! Per-point activity labels and display series thinning.

use serde::{Deserialize, Serialize};

use crate::GpsPoint;

/// Below this speed (m/s) the skier is considered stopped.
pub const STOPPED_SPEED_MPS: f64 = 0.5;
/// At or above this speed (m/s) movement is always skiing.
pub const SKIING_SPEED_MPS: f64 = 2.0;

const MPS_TO_KMH: f64 = 3.6;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Activity {
    Stationary,
    Lift,
    Skiing,
}

impl Activity {
    /// Classify the interval between two samples from their average speed.
    /// Slow movement is a lift ride when the altitude rose, skiing otherwise.
    pub fn for_pair(average_speed: f64, climbing: bool) -> Self {
        if average_speed < STOPPED_SPEED_MPS {
            Activity::Stationary
        } else if average_speed < SKIING_SPEED_MPS {
            if climbing {
                Activity::Lift
            } else {
                Activity::Skiing
            }
        } else {
            Activity::Skiing
        }
    }

    /// Classify a single sample from its own speed.
    pub fn for_point(speed: f64, climbing: bool) -> Self {
        if speed > SKIING_SPEED_MPS {
            Activity::Skiing
        } else if speed > STOPPED_SPEED_MPS {
            if climbing {
                Activity::Lift
            } else {
                Activity::Skiing
            }
        } else {
            Activity::Stationary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Stationary => "stationary",
            Activity::Lift => "lift",
            Activity::Skiing => "skiing",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePoint {
    pub index: usize,
    pub timestamp: i64,
    pub altitude: f64,
    pub speed_kmh: f64,
    pub activity: Activity,
}

pub fn speed_kmh(speed_mps: f64) -> f64 {
    speed_mps * MPS_TO_KMH
}

/// One activity label per point. The first point has no predecessor and is
/// never treated as climbing.
pub fn activity_profile(points: &[GpsPoint]) -> Vec<Activity> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let climbing = i > 0 && p.altitude > points[i - 1].altitude;
            Activity::for_point(p.speed, climbing)
        })
        .collect()
}

/// Stride that thins `len` samples down to roughly `target` of them.
pub fn sample_stride(len: usize, target: usize) -> usize {
    if target == 0 {
        return 1;
    }
    (len / target).max(1)
}

pub fn sample_indices(len: usize, target: usize) -> impl Iterator<Item = usize> {
    (0..len).step_by(sample_stride(len, target))
}

/// Altitude/speed profile with activity labels, thinned to about `target`
/// samples for charting.
pub fn altitude_profile(points: &[GpsPoint], target: usize) -> Vec<ProfilePoint> {
    let activities = activity_profile(points);
    sample_indices(points.len(), target)
        .map(|index| {
            let p = &points[index];
            ProfilePoint {
                index,
                timestamp: p.timestamp,
                altitude: p.altitude,
                speed_kmh: speed_kmh(p.speed),
                activity: activities[index],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_point;

    #[test]
    fn pair_classification_boundaries() {
        assert_eq!(Activity::for_pair(0.49, true), Activity::Stationary);
        assert_eq!(Activity::for_pair(0.5, true), Activity::Lift);
        assert_eq!(Activity::for_pair(1.9, false), Activity::Skiing);
        assert_eq!(Activity::for_pair(2.0, true), Activity::Skiing);
    }

    #[test]
    fn point_classification_uses_previous_altitude() {
        let points = vec![
            test_point(0, 47.0, 1000.0, 1.0),
            test_point(1000, 47.0, 1005.0, 1.0),
            test_point(2000, 47.0, 1004.0, 1.0),
            test_point(3000, 47.0, 1004.0, 0.2),
            test_point(4000, 47.0, 1010.0, 8.0),
        ];
        assert_eq!(
            activity_profile(&points),
            vec![
                Activity::Skiing,
                Activity::Lift,
                Activity::Skiing,
                Activity::Stationary,
                Activity::Skiing,
            ]
        );
    }

    #[test]
    fn sampling_thins_long_series() {
        assert_eq!(sample_stride(50, 100), 1);
        assert_eq!(sample_stride(1000, 100), 10);
        assert_eq!(sample_stride(10, 0), 1);
        assert_eq!(sample_indices(25, 10).collect::<Vec<_>>(), vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24]);
    }

    #[test]
    fn altitude_profile_converts_speed() {
        let points: Vec<_> = (0..400)
            .map(|i| test_point(i * 1000, 47.0, 2000.0 - i as f64, 5.0))
            .collect();
        let profile = altitude_profile(&points, 200);
        assert_eq!(profile.len(), 200);
        assert_eq!(profile[1].index, 2);
        assert!((profile[0].speed_kmh - 18.0).abs() < 1e-9);
        assert_eq!(profile[0].activity, Activity::Skiing);
    }
}
