//! Trip files in a data directory: one `<id>.json` per trip.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

const TRIP_EXTENSION: &str = "json";
const TRIP_DATE_MARKER: &str = "trip_";
// YYYYMMDD_HHMMSS
const TRIP_DATE_LEN: usize = 15;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("data directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("trip not found: {0}")]
    NotFound(String),
    #[error("invalid trip id: {0:?}")]
    InvalidId(String),
    #[error("trip data file is empty: {0}")]
    EmptyTrip(String),
    #[error("invalid JSON format in trip data file {id}: {source}")]
    InvalidJson {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TripSummary {
    pub id: String,
    pub filename: String,
    pub date: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMetadata {
    pub total_entries: usize,
    #[serde(rename = "hasGPS")]
    pub has_gps: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct TripRecord {
    pub id: String,
    pub data: JsonValue,
    pub metadata: TripMetadata,
}

/// All trips in `dir`, newest id first.
pub fn list_trips(dir: &Path) -> Result<Vec<TripSummary>, CatalogError> {
    if !dir.is_dir() {
        return Err(CatalogError::MissingDirectory(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut trips = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(TRIP_EXTENSION) {
            continue;
        }
        let (Some(id), Some(filename)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.file_name().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        trips.push(TripSummary {
            id: id.to_string(),
            filename: filename.to_string(),
            date: trip_date(id).unwrap_or_else(|| "Unknown".to_string()),
        });
    }
    trips.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(trips)
}

pub fn load_trip(dir: &Path, id: &str) -> Result<TripRecord, CatalogError> {
    let path = trip_path(dir, id)?;
    if !path.is_file() {
        return Err(CatalogError::NotFound(id.to_string()));
    }
    let text = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
        path: path.clone(),
        source,
    })?;
    if text.trim().is_empty() {
        return Err(CatalogError::EmptyTrip(id.to_string()));
    }
    let data: JsonValue =
        serde_json::from_str(&text).map_err(|source| CatalogError::InvalidJson {
            id: id.to_string(),
            source,
        })?;
    let metadata = trip_metadata(&data);
    Ok(TripRecord {
        id: id.to_string(),
        data,
        metadata,
    })
}

/// Remove a trip file, returning the path that was deleted.
pub fn delete_trip(dir: &Path, id: &str) -> Result<PathBuf, CatalogError> {
    let path = trip_path(dir, id)?;
    if !path.is_file() {
        return Err(CatalogError::NotFound(id.to_string()));
    }
    fs::remove_file(&path).map_err(|source| CatalogError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Path of the file backing `id`. Ids must be plain file stems.
pub fn trip_path(dir: &Path, id: &str) -> Result<PathBuf, CatalogError> {
    let valid = !id.is_empty()
        && id != "."
        && !id.contains("..")
        && !id.contains(['/', '\\'])
        && !id.contains('\0');
    if !valid {
        return Err(CatalogError::InvalidId(id.to_string()));
    }
    Ok(dir.join(format!("{id}.{TRIP_EXTENSION}")))
}

pub fn trip_metadata(data: &JsonValue) -> TripMetadata {
    match data.as_object() {
        Some(entries) => TripMetadata {
            total_entries: entries.len(),
            has_gps: entries
                .values()
                .any(|entry| entry.get("gps").is_some_and(is_truthy)),
        },
        None => TripMetadata {
            total_entries: 0,
            has_gps: false,
        },
    }
}

/// Recording time encoded in ids like `trip_20240120_090512`, rendered as
/// `2024-01-20 09:05`.
pub fn trip_date(id: &str) -> Option<String> {
    id.match_indices(TRIP_DATE_MARKER).find_map(|(start, marker)| {
        let from = start + marker.len();
        let stamp = id.get(from..from + TRIP_DATE_LEN)?;
        let parsed = NaiveDateTime::parse_from_str(stamp, "%Y%m%d_%H%M%S").ok()?;
        Some(parsed.format("%Y-%m-%d %H:%M").to_string())
    })
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}
