//! Parsed GPX tree
//!
//! The engine consumes this already-parsed tree; turning XML into it is the job
//! of an adapter. Text nodes are kept as text where the source format is
//! free-form (timestamps, speed annotations) and as `Scalar` where either a
//! number or its textual form may arrive.

use serde::{Deserialize, Serialize};

/// Root element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpxDocument {
    /// `creator` attribute
    #[serde(default)]
    pub creator: Option<String>,
    /// `version` attribute
    #[serde(default)]
    pub version: Option<String>,
    /// Document creation time (`metadata/time`)
    #[serde(default)]
    pub time: Option<String>,
    /// Namespace declarations on the root element
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// `trk` elements. Required: a document without a track container is rejected.
    pub tracks: Vec<TrackElement>,
    /// `wpt` elements
    #[serde(default)]
    pub waypoints: Vec<WaypointElement>,
    /// `rte` elements
    #[serde(default)]
    pub routes: Vec<RouteElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackElement {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub segments: Vec<SegmentElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentElement {
    #[serde(default)]
    pub points: Vec<PointElement>,
}

/// `trkpt` element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointElement {
    pub lat: Scalar,
    pub lon: Scalar,
    #[serde(default)]
    pub ele: Option<Scalar>,
    #[serde(default)]
    pub time: Option<String>,
    /// Free-text description, conventionally carrying the speed ("23 MPH")
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub extensions: Vec<ExtensionBlock>,
}

impl PointElement {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: Scalar::Number(lat),
            lon: Scalar::Number(lon),
            ele: None,
            time: None,
            desc: None,
            extensions: Vec::new(),
        }
    }
}

/// Children of one namespace inside `<extensions>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionBlock {
    pub namespace: String,
    #[serde(default)]
    pub values: Vec<ExtensionValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionValue {
    pub name: String,
    pub value: String,
}

/// `wpt` or `rtept` element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointElement {
    pub lat: Scalar,
    pub lon: Scalar,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub cmt: Option<String>,
    #[serde(default)]
    pub ele: Option<Scalar>,
    #[serde(default)]
    pub geoidheight: Option<Scalar>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub magvar: Option<Scalar>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub sym: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub fix: Option<String>,
    #[serde(default)]
    pub sat: Option<Scalar>,
    #[serde(default)]
    pub hdop: Option<Scalar>,
    #[serde(default)]
    pub vdop: Option<Scalar>,
    #[serde(default)]
    pub pdop: Option<Scalar>,
    #[serde(default)]
    pub ageofdgpsdata: Option<Scalar>,
    #[serde(default)]
    pub dgpsid: Option<Scalar>,
}

impl WaypointElement {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: Scalar::Number(lat),
            lon: Scalar::Number(lon),
            name: None,
            desc: None,
            cmt: None,
            ele: None,
            geoidheight: None,
            time: None,
            magvar: None,
            src: None,
            link: None,
            sym: None,
            kind: None,
            fix: None,
            sat: None,
            hdop: None,
            vdop: None,
            pdop: None,
            ageofdgpsdata: None,
            dgpsid: None,
        }
    }
}

/// `rte` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteElement {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub points: Vec<WaypointElement>,
}

/// A numeric attribute or text node, as either a number or its text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric value, or `None` for non-numeric or non-finite text
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Scalar::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
                Some(*n as u32)
            }
            Scalar::Number(_) => None,
            Scalar::Text(s) => s.trim().parse::<u32>().ok(),
        }
    }

    /// Text form as it appeared in the document
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl GpxDocument {
    /// Check the tree has the expected shape before anything is computed
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tracks.is_empty() {
            return Err(ValidationError::MissingTracks);
        }

        for (t, track) in self.tracks.iter().enumerate() {
            for (s, segment) in track.segments.iter().enumerate() {
                for (p, point) in segment.points.iter().enumerate() {
                    check_position(&point.lat, &point.lon, || {
                        format!("track {} / segment {} / point {}", t, s, p)
                    })?;
                }
            }
        }

        for (w, waypoint) in self.waypoints.iter().enumerate() {
            check_position(&waypoint.lat, &waypoint.lon, || format!("waypoint {}", w))?;
        }

        for (r, route) in self.routes.iter().enumerate() {
            for (p, point) in route.points.iter().enumerate() {
                check_position(&point.lat, &point.lon, || {
                    format!("route {} / point {}", r, p)
                })?;
            }
        }

        Ok(())
    }
}

fn check_position(
    lat: &Scalar,
    lon: &Scalar,
    location: impl Fn() -> String,
) -> Result<(), ValidationError> {
    match (lat.as_f64(), lon.as_f64()) {
        (Some(lat), Some(lon)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidPosition {
            location: location(),
            lat: lat.to_text(),
            lon: lon.to_text(),
        }),
    }
}

/// Structural problems found in a parsed tree
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("document contains no track container")]
    MissingTracks,

    #[error("invalid position at {location}: lat={lat}, lon={lon}")]
    InvalidPosition {
        location: String,
        lat: String,
        lon: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_point_document(lat: Scalar, lon: Scalar) -> GpxDocument {
        let mut point = PointElement::new(0.0, 0.0);
        point.lat = lat;
        point.lon = lon;
        GpxDocument {
            tracks: vec![TrackElement {
                name: Some("Test".to_string()),
                segments: vec![SegmentElement {
                    points: vec![point],
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_scalar_accepts_numbers_and_text() {
        let parsed: Vec<Scalar> = serde_json::from_str(r#"[51.5, " -0.25 ", "abc"]"#).unwrap();

        assert_eq!(parsed[0].as_f64(), Some(51.5));
        assert_eq!(parsed[1].as_f64(), Some(-0.25));
        assert_eq!(parsed[1].to_text(), "-0.25");
        assert_eq!(parsed[2].as_f64(), None);
    }

    #[test]
    fn test_validate_accepts_well_formed_tree() {
        let document = single_point_document("51.5".into(), "-0.12".into());
        assert!(document.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_tracks() {
        let document = GpxDocument::default();
        assert_eq!(document.validate(), Err(ValidationError::MissingTracks));
    }

    #[test]
    fn test_validate_reports_bad_position() {
        let document = single_point_document("north".into(), 10.0.into());

        match document.validate() {
            Err(ValidationError::InvalidPosition { location, .. }) => {
                assert_eq!(location, "track 0 / segment 0 / point 0");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_latitude() {
        let document = single_point_document(91.0.into(), 10.0.into());
        assert!(document.validate().is_err());
    }

    #[test]
    fn test_tracks_are_required_in_json() {
        let result = serde_json::from_str::<GpxDocument>(r#"{"creator": "x"}"#);
        assert!(result.is_err());
    }
}
