//! Human-readable renderings of trip values.

use chrono::{DateTime, Utc};

use crate::profile::speed_kmh;

pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round())
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

pub fn format_speed(speed_mps: f64) -> String {
    format!("{:.1} km/h", speed_kmh(speed_mps))
}

pub fn format_duration(seconds: f64) -> String {
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds % 3600.0) / 60.0).floor();
    let secs = (seconds % 60.0).floor();
    if hours > 0.0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0.0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

pub fn format_altitude(meters: f64) -> String {
    format!("{} m", meters.round())
}

/// Render a millisecond timestamp as e.g. `Jan 20, 2024, 09:05 AM` (UTC).
pub fn format_date(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(time) => time.format("%b %-d, %Y, %I:%M %p").to_string(),
        None => "Invalid Date".to_string(),
    }
}
