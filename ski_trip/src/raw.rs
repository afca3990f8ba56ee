//! Typed view over the raw, timestamp-keyed trip log.
//!
//! Trip logs are JSON objects whose keys are millisecond timestamps and whose
//! values are free-form records. Only the `gps` block matters here; every
//! field of it is optional and only counts when it holds a JSON number.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGps {
    #[serde(default, deserialize_with = "numeric")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "numeric")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "numeric")]
    pub altitude: Option<f64>,
    #[serde(default, deserialize_with = "numeric")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "numeric")]
    pub horizontal_accuracy: Option<f64>,
    #[serde(default, deserialize_with = "numeric")]
    pub course: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawLogEntry {
    #[serde(default, deserialize_with = "lenient_gps")]
    pub gps: Option<RawGps>,
}

impl RawLogEntry {
    /// Read an entry from any JSON value. Non-object entries carry no GPS block.
    pub fn from_value(value: &JsonValue) -> Self {
        if !value.is_object() {
            return RawLogEntry::default();
        }
        RawLogEntry::deserialize(value).unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawLog {
    entries: Vec<(String, RawLogEntry)>,
}

impl RawLog {
    /// Returns `None` when the value is not a JSON object.
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        Some(
            object
                .iter()
                .map(|(key, entry)| (key.clone(), RawLogEntry::from_value(entry)))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[(String, RawLogEntry)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, RawLogEntry)> for RawLog {
    fn from_iter<I: IntoIterator<Item = (String, RawLogEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parse a timestamp key the way a lenient integer parser would: optional
/// leading whitespace and sign, then a run of digits. Anything after the
/// digits is ignored. Keys without leading digits yield `None`.
pub fn parse_timestamp_key(key: &str) -> Option<i64> {
    let trimmed = key.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

fn numeric<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(JsonValue::deserialize(deserializer)?.as_f64())
}

fn lenient_gps<'de, D>(deserializer: D) -> Result<Option<RawGps>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    // Derived struct impls also accept sequences; a gps block must be an object.
    if !value.is_object() {
        return Ok(None);
    }
    Ok(RawGps::deserialize(&value).ok())
}
