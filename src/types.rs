//! Output object graph for gpx-ingest
//!
//! A `Journey` is the root of the graph produced by one ingestion pass. It owns
//! tracks, which own segments, which own points; every level carries a `Stats`
//! block of the same shape so that values roll up consistently.

use crate::policy::{Category, ExperimentalFeatures, SmartTrack};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// String-keyed map that preserves insertion order, including through serde.
///
/// Lookups and inserts go through a key -> position index, so building a
/// segment of n points stays linear in n.
#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    positions: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PartialEq> PartialEq for OrderedMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Insert a value, replacing (in place) any existing value under the same key
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.positions.get(&key) {
            Some(&position) => {
                if let Some(entry) = self.entries.get_mut(position) {
                    entry.1 = value;
                }
            }
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let position = *self.positions.get(key)?;
        self.entries.get(position).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let position = *self.positions.get(key)?;
        self.entries.get_mut(position).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map with string keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Provenance of the ingested document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Created {
    pub creator: String,
    pub format: String,
    pub version: String,
    /// Document creation time (UNIX epoch seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
}

/// One recorded sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<String>,
    /// UNIX epoch seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_uom: Option<String>,
    /// Speed was derived from distance and time rather than read from the document
    #[serde(default, skip_serializing_if = "is_false")]
    pub speed_auto: bool,
    /// m/s²
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<f64>,
    /// m/s², positive magnitude
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceleration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Elevation change since the previous point of the segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_change: Option<f64>,
    /// Feet travelled since the previous point of the segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Extension values keyed by namespace, then by element name
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub extensions: OrderedMap<OrderedMap<String>>,
}

/// Contiguous run of points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub points: OrderedMap<Point>,
    pub stats: Stats,
}

/// Named grouping of segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub segments: OrderedMap<Segment>,
    pub stats: Stats,
}

/// Elevation aggregates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    pub min: f64,
    pub max: f64,
    pub avg_change: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Lat/lon bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lat: Range,
    pub lon: Range,
}

/// Aggregates for one scope (segment, track or journey)
///
/// Fields belonging to a suppressed category are left as `None` and omitted
/// from the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub trackpoints: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_duration: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modal_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub speed_uom: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_acceleration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_acceleration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_acceleration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_deceleration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_deceleration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_deceleration: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_moving: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_stationary: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_accelerating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_decelerating: Option<i64>,

    /// Feet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_travelled: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<ElevationStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

/// Which values were derived rather than read
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoCalc {
    pub speed: bool,
}

/// Per-point values that were malformed and recovered locally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredCounts {
    pub timestamps: usize,
    pub elevations: usize,
    pub speeds: usize,
}

/// What was computed versus suppressed, and under which policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub suppression: Vec<Category>,
    pub auto_calc: AutoCalc,
    pub experimental: ExperimentalFeatures,
    pub smart_track: SmartTrack,
    pub recovered: RecoveredCounts,
    /// Engine version that produced the graph
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoid_height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaypointMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnetic_variation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Fix quality reported by the receiver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsQuality {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellites: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdop: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdop: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdop: Option<f64>,
    /// Seconds since the last DGPS update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dgps_age: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dgps_id: Option<u32>,
}

/// Standalone point outside any track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub position: Position,
    pub meta: WaypointMeta,
    pub gps: GpsQuality,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub points: Vec<Waypoint>,
}

/// Root of the output graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub created: Created,
    pub timezone: String,
    pub tracks: OrderedMap<Track>,
    pub stats: Stats,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Waypoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
}

impl Journey {
    pub fn track(&self, track: &str) -> Option<&Track> {
        self.tracks.get(track)
    }

    pub fn segment(&self, track: &str, segment: &str) -> Option<&Segment> {
        self.track(track)?.segments.get(segment)
    }

    pub fn point(&self, track: &str, segment: &str, point: &str) -> Option<&Point> {
        self.segment(track, segment)?.points.get(point)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
