//! Speed annotation parsing and unit normalization
//!
//! Also normalizes point timestamps to UNIX epoch seconds.
//!
//! GPX has no widely used speed element, so devices smuggle speed into the
//! free-text `desc` of each point ("23 MPH"). This module pulls the magnitude
//! and unit back out and converts to metres per second.
//! - Parsing never fails: no digits means a magnitude of 0
//! - Only mph and kph are converted; anything else is taken as m/s

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const METRES_PER_MILE: f64 = 1609.344;
const METRES_PER_KILOMETRE: f64 = 1000.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Recognised speed units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    Mph,
    Kph,
    Other,
}

impl SpeedUnit {
    pub fn from_token(token: &str) -> Self {
        match token {
            "mph" => SpeedUnit::Mph,
            "kph" => SpeedUnit::Kph,
            _ => SpeedUnit::Other,
        }
    }
}

/// Speed extracted from an annotation
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedReading {
    pub magnitude: f64,
    /// Lower-cased trailing token, "mph" or "kph" for well-formed input
    pub unit: String,
    /// Whether any digit was found
    pub numeric: bool,
}

/// Extract (magnitude, unit) from a free-text speed annotation.
///
/// The magnitude is the integer formed by the digits of the string, in order;
/// the unit is the last three characters, lower-cased.
pub fn parse_speed(annotation: &str) -> SpeedReading {
    let trimmed = annotation.trim();

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let numeric = !digits.is_empty();
    let magnitude = if numeric {
        digits.parse::<f64>().unwrap_or(0.0)
    } else {
        0.0
    };

    let tail: Vec<char> = trimmed.chars().rev().take(3).collect();
    let unit: String = tail.into_iter().rev().collect::<String>().to_lowercase();

    SpeedReading {
        magnitude,
        unit,
        numeric,
    }
}

/// Convert a speed in the given unit token to metres per second
pub fn to_metres_per_second(magnitude: f64, unit: &str) -> f64 {
    match SpeedUnit::from_token(unit) {
        SpeedUnit::Kph => magnitude * METRES_PER_KILOMETRE / SECONDS_PER_HOUR,
        SpeedUnit::Mph => magnitude * METRES_PER_MILE / SECONDS_PER_HOUR,
        SpeedUnit::Other => magnitude,
    }
}

/// Parse a point timestamp to UNIX epoch seconds.
///
/// Accepts RFC 3339 (the GPX form), an offset-less ISO 8601 date-time taken as
/// UTC, or a bare epoch integer within chrono's representable range.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    let epoch = text.parse::<i64>().ok()?;
    DateTime::from_timestamp(epoch, 0).map(|parsed| parsed.timestamp())
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
