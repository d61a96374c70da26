//! Core domain types shared across the enrichment pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version for the points report format.
pub const POINTS_SCHEMA_VERSION: u32 = 1;

/// Altitude in meters, rounded to 0.1 m. `None` when the service had no data.
pub type AltitudeResult = Option<f64>;

// ---------------------------------------------------------------------------
// InjectionMode
// ---------------------------------------------------------------------------

/// Where the altitude is stored on a trackpoint node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionMode {
    /// `<trkpt lat=".." lon=".." ele="..">`
    #[default]
    Attribute,
    /// `<trkpt lat=".." lon=".."><ele>..</ele></trkpt>`
    Element,
}

impl InjectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::Element => "element",
        }
    }
}

impl std::fmt::Display for InjectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InjectionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "attribute" => Ok(Self::Attribute),
            "element" => Ok(Self::Element),
            other => Err(format!(
                "unknown injection mode '{other}': expected 'attribute' or 'element'"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinate / AltitudeKey
// ---------------------------------------------------------------------------

/// A parsed latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Map key built from the original `lat`/`lon` tokens, never from parsed values.
///
/// `"48.0"` and `"48.00"` produce different keys even though they parse to the
/// same number, and two points with identical tokens share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AltitudeKey(String);

impl AltitudeKey {
    pub fn new(lat_token: &str, lon_token: &str) -> Self {
        Self(format!("{lat_token},{lon_token}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Points report
// ---------------------------------------------------------------------------

/// One entry of the structured point list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub lat: f64,
    pub lon: f64,
    /// Altitude in meters, `null` when the service had no data.
    pub ele: AltitudeResult,
}

/// The structured point list written next to the enriched track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsReport {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// File name of the source track.
    pub source: String,
    /// Tool version that produced the report.
    pub tool_version: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Points in document order.
    pub points: Vec<PointRecord>,
}

impl PointsReport {
    pub fn new(source: impl Into<String>, tool_version: impl Into<String>, points: Vec<PointRecord>) -> Self {
        Self {
            schema_version: POINTS_SCHEMA_VERSION,
            source: source.into(),
            tool_version: tool_version.into(),
            generated_at: Utc::now(),
            points,
        }
    }
}
