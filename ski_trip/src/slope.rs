//! Slope gradient, difficulty and run segmentation.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::GpsPoint;

pub const STEEPEST_SECTION_COUNT: usize = 5;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Green,
    Blue,
    Red,
    Black,
}

impl Difficulty {
    /// Piste grade for a gradient in percent.
    pub fn from_gradient(gradient_pct: f64) -> Self {
        match gradient_pct {
            g if g < 15.0 => Difficulty::Green,
            g if g < 25.0 => Difficulty::Blue,
            g if g < 40.0 => Difficulty::Red,
            _ => Difficulty::Black,
        }
    }
}

/// Descent distance (m) per piste grade.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlopeDifficulty {
    pub green: f64,
    pub blue: f64,
    pub red: f64,
    pub black: f64,
}

impl SlopeDifficulty {
    pub fn add(&mut self, difficulty: Difficulty, distance_m: f64) {
        let slot = match difficulty {
            Difficulty::Green => &mut self.green,
            Difficulty::Blue => &mut self.blue,
            Difficulty::Red => &mut self.red,
            Difficulty::Black => &mut self.black,
        };
        *slot += distance_m;
    }

    pub fn total(&self) -> f64 {
        self.green + self.blue + self.red + self.black
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start_index: usize,
    pub end_index: usize,
    pub distance: f64,
    /// Previous minus current altitude; positive when descending.
    pub altitude_change: f64,
    /// Percent.
    pub gradient: f64,
    pub is_descent: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub start_index: usize,
    pub end_index: usize,
    pub distance: f64,
    pub vertical_drop: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlopeAnalysis {
    pub average_gradient: f64,
    pub steepest_sections: Vec<Segment>,
    pub slope_difficulty: SlopeDifficulty,
    pub runs: Vec<Run>,
    pub total_runs: usize,
    pub longest_run: f64,
    pub total_descent_distance: f64,
}

/// One segment per consecutive pair. Pairs with no horizontal movement
/// have no defined gradient and are skipped.
pub fn build_segments(points: &[GpsPoint]) -> Vec<Segment> {
    points
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let distance = pair[0].distance_to(&pair[1]);
            if distance <= 0.0 {
                return None;
            }
            let altitude_change = pair[0].altitude - pair[1].altitude;
            Some(Segment {
                start_index: i,
                end_index: i + 1,
                distance,
                altitude_change,
                gradient: altitude_change.abs() / distance * 100.0,
                is_descent: altitude_change > 0.0,
            })
        })
        .collect()
}

/// Group consecutive descending segments into runs. Any other segment ends
/// the run in progress.
pub fn segment_runs(segments: &[Segment]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut current: Option<Run> = None;
    for seg in segments {
        if !seg.is_descent {
            runs.extend(current.take());
            continue;
        }
        let drop = seg.altitude_change.abs();
        match current.as_mut() {
            Some(run) => {
                run.end_index = seg.end_index;
                run.distance += seg.distance;
                run.vertical_drop += drop;
            }
            None => {
                current = Some(Run {
                    start_index: seg.start_index,
                    end_index: seg.end_index,
                    distance: seg.distance,
                    vertical_drop: drop,
                })
            }
        }
    }
    runs.extend(current);
    runs
}

pub fn calculate_slope_analysis(points: &[GpsPoint]) -> SlopeAnalysis {
    if points.len() < 2 {
        return SlopeAnalysis::default();
    }

    let segments = build_segments(points);

    let mut weighted_gradient = 0.0;
    let mut total_distance = 0.0;
    let mut slope_difficulty = SlopeDifficulty::default();
    let mut total_descent_distance = 0.0;
    for seg in &segments {
        weighted_gradient += seg.gradient * seg.distance;
        total_distance += seg.distance;
        if seg.is_descent {
            slope_difficulty.add(Difficulty::from_gradient(seg.gradient), seg.distance);
            total_descent_distance += seg.distance;
        }
    }
    let average_gradient = if total_distance > 0.0 {
        weighted_gradient / total_distance
    } else {
        0.0
    };

    let mut steepest_sections: Vec<Segment> =
        segments.iter().filter(|s| s.is_descent).cloned().collect();
    // Stable: equal gradients keep track order.
    steepest_sections.sort_by_key(|s| Reverse(OrderedFloat(s.gradient)));
    steepest_sections.truncate(STEEPEST_SECTION_COUNT);

    let runs = segment_runs(&segments);
    let longest_run = runs.iter().map(|r| r.distance).fold(0.0, f64::max);

    SlopeAnalysis {
        average_gradient,
        steepest_sections,
        slope_difficulty,
        total_runs: runs.len(),
        runs,
        longest_run,
        total_descent_distance,
    }
}
