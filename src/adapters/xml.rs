//! GPX XML adapter
//!
//! Reads GPX 1.0/1.1 XML with the `gpx` crate and maps it onto the document
//! tree. Speed annotations travel in each point's `desc`, as recorded.

use crate::error::IngestError;
use crate::schema::{
    GpxDocument, PointElement, RouteElement, Scalar, SegmentElement, TrackElement,
    WaypointElement,
};
use ::gpx::{Fix, Gpx, GpxVersion, Time, Waypoint};
use log::debug;

use super::DocumentAdapter;

/// Namespace of the GPX 1.1 schema
const GPX11_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
/// Namespace of the GPX 1.0 schema
const GPX10_NAMESPACE: &str = "http://www.topografix.com/GPX/1/0";

/// GPX XML adapter
pub struct GpxXmlAdapter;

impl DocumentAdapter for GpxXmlAdapter {
    fn parse(&self, raw: &str) -> Result<GpxDocument, IngestError> {
        let gpx: Gpx = ::gpx::read(raw.as_bytes())
            .map_err(|e| IngestError::ParseError(e.to_string()))?;

        let (version, namespace) = match gpx.version {
            GpxVersion::Gpx10 => (Some("1.0".to_string()), Some(GPX10_NAMESPACE)),
            GpxVersion::Gpx11 => (Some("1.1".to_string()), Some(GPX11_NAMESPACE)),
            _ => (None, None),
        };

        let document = GpxDocument {
            creator: gpx.creator.clone(),
            version,
            time: gpx
                .metadata
                .as_ref()
                .and_then(|m| m.time.as_ref())
                .and_then(format_time),
            namespaces: namespace.map(str::to_string).into_iter().collect(),
            tracks: gpx
                .tracks
                .iter()
                .map(|track| TrackElement {
                    name: track.name.clone(),
                    segments: track
                        .segments
                        .iter()
                        .map(|segment| SegmentElement {
                            points: segment.points.iter().map(convert_point).collect(),
                        })
                        .collect(),
                })
                .collect(),
            waypoints: gpx.waypoints.iter().map(convert_waypoint).collect(),
            routes: gpx
                .routes
                .iter()
                .map(|route| RouteElement {
                    name: route.name.clone(),
                    points: route.points.iter().map(convert_waypoint).collect(),
                })
                .collect(),
        };

        debug!(
            "parsed GPX {:?}: {} tracks, {} waypoints, {} routes",
            document.version,
            document.tracks.len(),
            document.waypoints.len(),
            document.routes.len()
        );
        Ok(document)
    }
}

fn format_time(time: &Time) -> Option<String> {
    time.format().ok()
}

fn convert_point(point: &Waypoint) -> PointElement {
    let position = point.point();
    PointElement {
        ele: point.elevation.map(Scalar::Number),
        time: point.time.as_ref().and_then(format_time),
        desc: point.description.clone(),
        ..PointElement::new(position.y(), position.x())
    }
}

fn convert_waypoint(point: &Waypoint) -> WaypointElement {
    let position = point.point();
    WaypointElement {
        name: point.name.clone(),
        desc: point.description.clone(),
        cmt: point.comment.clone(),
        ele: point.elevation.map(Scalar::Number),
        geoidheight: point.geoidheight.map(Scalar::Number),
        time: point.time.as_ref().and_then(format_time),
        src: point.source.clone(),
        link: point.links.first().map(|link| link.href.clone()),
        sym: point.symbol.clone(),
        kind: point.type_.clone(),
        fix: point.fix.as_ref().map(fix_name),
        sat: point.sat.map(|n| Scalar::Number(n as f64)),
        hdop: point.hdop.map(Scalar::Number),
        vdop: point.vdop.map(Scalar::Number),
        pdop: point.pdop.map(Scalar::Number),
        ageofdgpsdata: point.dgps_age.map(Scalar::Number),
        dgpsid: point.dgpsid.map(|n| Scalar::Number(f64::from(n))),
        ..WaypointElement::new(position.y(), position.x())
    }
}

fn fix_name(fix: &Fix) -> String {
    match fix {
        Fix::None => "none".to_string(),
        Fix::TwoDimensional => "2d".to_string(),
        Fix::ThreeDimensional => "3d".to_string(),
        Fix::DGPS => "dgps".to_string(),
        Fix::PPS => "pps".to_string(),
        Fix::Other(other) => other.clone(),
    }
}
