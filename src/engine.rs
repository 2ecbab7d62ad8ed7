//! Ingestion engine
//!
//! Walks a parsed document once, tracks -> segments -> points, and produces the
//! output graph. For every point the engine:
//! 1. Computes the entry period and applies the SmartTrack split rule
//! 2. Writes the fields that are not suppressed
//! 3. Runs the derived-value calculators against the carried context
//! 4. Records the point into the segment, track and journey accumulators
//!
//! Stats are finalized bottom-up as each segment and track closes. Any failure
//! aborts the whole run; a half-built journey is never returned.

use crate::accumulator::{Accumulator, JourneyAccumulator, PointSample, SegmentAccumulator, TrackAccumulator};
use crate::context::DerivationContext;
use crate::error::{IngestError, Scope};
use crate::features;
use crate::index::JourneyIndex;
use crate::normalizer::{parse_speed, parse_timestamp};
use crate::policy::{Category, IngestConfig, Suppression};
use crate::schema::{GpxDocument, PointElement, RouteElement, Scalar, WaypointElement};
use crate::stats::{finalize, Level};
use crate::types::{
    AutoCalc, Created, GpsQuality, Journey, Metadata, OrderedMap, Point, Position,
    RecoveredCounts, Route, Segment, Track, Waypoint, WaypointMeta,
};
use crate::ENGINE_VERSION;
use log::{debug, info, warn};
use std::mem;

/// Source format recorded in `Created`
pub const SOURCE_FORMAT: &str = "GPX";

/// Result of one ingestion pass
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub journey: Journey,
    pub index: JourneyIndex,
}

/// Runs ingestion passes under a fixed configuration.
///
/// The engine itself holds no per-run state, so one engine can ingest any
/// number of documents one after another.
#[derive(Debug, Clone)]
pub struct IngestionEngine {
    config: IngestConfig,
}

impl Default for IngestionEngine {
    fn default() -> Self {
        Self {
            config: IngestConfig::default(),
        }
    }
}

impl IngestionEngine {
    pub fn new(config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest a parsed document
    pub fn ingest(&self, document: &GpxDocument) -> Result<Ingested, IngestError> {
        document
            .validate()
            .map_err(|e| IngestError::InvalidInput(e.to_string()))?;

        let mut run = IngestRun::new(&self.config);

        for input_track in &document.tracks {
            let name = input_track.name.clone().unwrap_or_default();
            let mut track = run.open_track(&name);

            for input_segment in &input_track.segments {
                let mut segment = run.open_segment(&mut track);
                for element in &input_segment.points {
                    run.process_point(&mut track, &mut segment, element, &name)?;
                }
                run.close_segment(&mut track, segment)?;
            }

            run.close_track(track)?;
        }

        run.finish(document)
    }
}

/// Track under construction
struct OpenTrack {
    key: String,
    name: String,
    segments: OrderedMap<Segment>,
    acc: TrackAccumulator,
    next_segment: usize,
}

/// Segment under construction
#[derive(Default)]
struct OpenSegment {
    key: String,
    points: OrderedMap<Point>,
    acc: SegmentAccumulator,
}

/// State of a single pass
struct IngestRun<'a> {
    config: &'a IngestConfig,
    tracks: OrderedMap<Track>,
    index: JourneyIndex,
    journey_acc: JourneyAccumulator,
    ctx: DerivationContext,
    next_track: usize,
    recovered: RecoveredCounts,
    auto_speed: bool,
}

impl<'a> IngestRun<'a> {
    fn new(config: &'a IngestConfig) -> Self {
        Self {
            config,
            tracks: OrderedMap::new(),
            index: JourneyIndex::new(),
            journey_acc: Accumulator::new(),
            ctx: DerivationContext::new(),
            next_track: 0,
            recovered: RecoveredCounts::default(),
            auto_speed: false,
        }
    }

    fn open_track(&mut self, name: &str) -> OpenTrack {
        let key = format!("journey{}", self.next_track);
        self.next_track += 1;

        debug!("opening track {} ({:?})", key, name);
        self.index.register_track(&key, name);

        OpenTrack {
            key,
            name: name.to_string(),
            segments: OrderedMap::new(),
            acc: Accumulator::new(),
            next_segment: 0,
        }
    }

    fn open_segment(&mut self, track: &mut OpenTrack) -> OpenSegment {
        let key = format!("seg{}", track.next_segment);
        track.next_segment += 1;

        debug!("opening segment {}/{}", track.key, key);
        self.ctx.reset();

        OpenSegment {
            key,
            points: OrderedMap::new(),
            acc: Accumulator::new(),
        }
    }

    fn close_segment(
        &mut self,
        track: &mut OpenTrack,
        segment: OpenSegment,
    ) -> Result<(), IngestError> {
        let scope = Scope::Segment {
            track: track.key.clone(),
            segment: segment.key.clone(),
        };
        let stats = finalize(&segment.acc, &scope, Level::Segment, self.config)?;

        track.acc.absorb_segment(stats.duration);
        self.index
            .record_segment(&track.key, &segment.key, segment.points.len());
        track.segments.insert(
            segment.key,
            Segment {
                points: segment.points,
                stats,
            },
        );
        Ok(())
    }

    fn close_track(&mut self, track: OpenTrack) -> Result<(), IngestError> {
        let scope = Scope::Track {
            track: track.key.clone(),
        };
        let stats = finalize(&track.acc, &scope, Level::Track, self.config)?;

        self.journey_acc
            .absorb_track(stats.recorded_duration, track.acc.segments);
        self.tracks.insert(
            track.key,
            Track {
                name: track.name,
                segments: track.segments,
                stats,
            },
        );
        Ok(())
    }

    /// Close the current segment and track, and continue in a fresh track.
    ///
    /// The new track is named after the input track with its own index
    /// appended, and starts with a clean derivation context.
    fn split(
        &mut self,
        track: &mut OpenTrack,
        segment: &mut OpenSegment,
        name: &str,
    ) -> Result<(), IngestError> {
        let closed_segment = mem::take(segment);
        self.close_segment(track, closed_segment)?;

        let split_name = format!("{}-{}", name, self.next_track);
        let fresh_track = self.open_track(&split_name);
        let closed_track = mem::replace(track, fresh_track);
        self.close_track(closed_track)?;

        *segment = self.open_segment(track);
        Ok(())
    }

    fn process_point(
        &mut self,
        track: &mut OpenTrack,
        segment: &mut OpenSegment,
        element: &PointElement,
        name: &str,
    ) -> Result<(), IngestError> {
        let config = self.config;
        let suppression = &config.suppression;

        let time = if suppression.allows(Category::Date) {
            self.point_time(element.time.as_deref())
        } else {
            None
        };

        let mut period = self.ctx.begin_point(time);
        if config.smart_track.should_split(self.ctx.last_time, period) {
            debug!(
                "smart track: {}s gap after {}/{} exceeds {}s, splitting",
                period, track.key, segment.key, config.smart_track.threshold
            );
            self.split(track, segment, name)?;
            period = self.ctx.begin_point(time);
        }

        let position = match (element.lat.as_f64(), element.lon.as_f64()) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(IngestError::InvalidInput(format!(
                    "point {} in {}/{} has no usable position",
                    segment.points.len(),
                    track.key,
                    segment.key
                )))
            }
        };

        let mut point = Point {
            time,
            extensions: collect_extensions(element),
            ..Default::default()
        };
        let mut sample = PointSample {
            time,
            ..Default::default()
        };

        let mut had_previous_position = false;
        if suppression.allows(Category::Location) {
            point.lat = Some(element.lat.to_text());
            point.lon = Some(element.lon.to_text());
            sample.position = Some(position);

            had_previous_position = self.ctx.last_position.is_some();
            let enabled = config.distance_enabled();
            let travelled = features::distance(&mut self.ctx, position, enabled);
            if enabled {
                point.distance = Some(travelled);
                sample.distance = Some(travelled);
            }
        }

        if suppression.allows(Category::Elevation) {
            if let Some(elevation) = self.point_elevation(element.ele.as_ref()) {
                let change = features::elevation_change(&mut self.ctx, elevation);
                point.elevation = Some(elevation);
                point.elevation_change = Some(change);
                sample.elevation = Some(elevation);
                sample.elevation_change = Some(change);
            }
        }

        if suppression.allows(Category::Speed) {
            let travelled = point.distance.filter(|_| had_previous_position);
            let (magnitude, unit, derived) =
                self.point_speed(element.desc.as_deref(), travelled, period);

            point.speed = Some(magnitude);
            point.speed_uom = Some(unit.clone()).filter(|u| !u.is_empty());
            point.speed_auto = derived;
            sample.speed = Some(magnitude);
            sample.speed_unit = point.speed_uom.clone();

            if time.is_some() {
                let change = features::acceleration(&mut self.ctx, magnitude, &unit);
                point.acceleration = Some(change.acceleration);
                point.deceleration = Some(change.deceleration);
                sample.acceleration = change.acceleration;
                sample.deceleration = change.deceleration;
                sample.accelerating_secs = change.accelerating_secs;
                sample.decelerating_secs = change.decelerating_secs;

                if magnitude > 0.0 {
                    sample.moving_secs = period;
                } else {
                    sample.stationary_secs = period;
                }
            }
        }

        self.ctx.finish_point(time);

        segment.acc.record(&sample);
        track.acc.record(&sample);
        self.journey_acc.record(&sample);

        let key = format!("trackpt{}", segment.points.len());
        segment.points.insert(key, point);
        Ok(())
    }

    /// Timestamp for a point; malformed values are dropped and counted
    fn point_time(&mut self, text: Option<&str>) -> Option<i64> {
        let text = text?;
        let parsed = parse_timestamp(text);
        if parsed.is_none() {
            warn!("unparseable timestamp {:?}, treating point as undated", text);
            self.recovered.timestamps += 1;
        }
        parsed
    }

    fn point_elevation(&mut self, value: Option<&Scalar>) -> Option<f64> {
        let value = value?;
        let parsed = value.as_f64();
        if parsed.is_none() {
            warn!("unparseable elevation {:?}, ignoring", value.to_text());
            self.recovered.elevations += 1;
        }
        parsed
    }

    /// Speed magnitude, unit token and whether it was derived.
    ///
    /// An annotation always wins. Without one, speed is derived from the
    /// distance travelled when that is available, and is 0 otherwise.
    fn point_speed(
        &mut self,
        annotation: Option<&str>,
        travelled: Option<f64>,
        period: i64,
    ) -> (f64, String, bool) {
        match annotation.map(str::trim).filter(|a| !a.is_empty()) {
            Some(annotation) => {
                let reading = parse_speed(annotation);
                if !reading.numeric {
                    warn!("speed annotation {:?} has no digits, using 0", annotation);
                    self.recovered.speeds += 1;
                }
                (reading.magnitude, reading.unit, false)
            }
            None => match travelled.and_then(|feet| features::auto_speed_mph(feet, period)) {
                Some(mph) => {
                    self.auto_speed = true;
                    (mph, "mph".to_string(), true)
                }
                None => (0.0, String::new(), false),
            },
        }
    }

    fn finish(self, document: &GpxDocument) -> Result<Ingested, IngestError> {
        let config = self.config;
        let stats = finalize(&self.journey_acc, &Scope::Journey, Level::Journey, config)?;

        let created = Created {
            creator: document.creator.clone().unwrap_or_default(),
            format: SOURCE_FORMAT.to_string(),
            version: document.version.clone().unwrap_or_default(),
            time: document.time.as_deref().and_then(parse_timestamp),
            namespaces: document.namespaces.clone(),
        };

        let waypoints = document
            .waypoints
            .iter()
            .map(|w| build_waypoint(w, &config.suppression))
            .collect();
        let routes = document
            .routes
            .iter()
            .map(|r| build_route(r, &config.suppression))
            .collect();

        let metadata = Metadata {
            suppression: config.suppression.categories(),
            auto_calc: AutoCalc {
                speed: self.auto_speed,
            },
            experimental: config.experimental,
            smart_track: config.smart_track,
            recovered: self.recovered,
            version: ENGINE_VERSION.to_string(),
        };

        info!(
            "ingested {} tracks, {} segments, {} points",
            stats.tracks.unwrap_or(0),
            stats.segments.unwrap_or(0),
            stats.trackpoints
        );

        Ok(Ingested {
            journey: Journey {
                created,
                timezone: config.timezone.clone(),
                tracks: self.tracks,
                stats,
                metadata,
                waypoints,
                routes,
            },
            index: self.index,
        })
    }
}

/// Extension values grouped by namespace; repeated namespaces are merged
fn collect_extensions(element: &PointElement) -> OrderedMap<OrderedMap<String>> {
    let mut extensions: OrderedMap<OrderedMap<String>> = OrderedMap::new();
    for block in &element.extensions {
        if extensions.get(&block.namespace).is_none() {
            extensions.insert(block.namespace.clone(), OrderedMap::new());
        }
        if let Some(values) = extensions.get_mut(&block.namespace) {
            for value in &block.values {
                values.insert(value.name.clone(), value.value.clone());
            }
        }
    }
    extensions
}

fn build_waypoint(element: &WaypointElement, suppression: &Suppression) -> Waypoint {
    let located = suppression.allows(Category::Location);

    Waypoint {
        name: element.name.clone(),
        description: element.desc.clone(),
        comment: element.cmt.clone(),
        position: Position {
            lat: located.then(|| element.lat.to_text()),
            lon: located.then(|| element.lon.to_text()),
            elevation: if suppression.allows(Category::Elevation) {
                element.ele.as_ref().and_then(Scalar::as_f64)
            } else {
                None
            },
            geoid_height: element.geoidheight.as_ref().and_then(Scalar::as_f64),
        },
        meta: WaypointMeta {
            time: if suppression.allows(Category::Date) {
                element.time.as_deref().and_then(parse_timestamp)
            } else {
                None
            },
            magnetic_variation: element.magvar.as_ref().and_then(Scalar::as_f64),
            source: element.src.clone(),
            link: element.link.clone(),
            symbol: element.sym.clone(),
            kind: element.kind.clone(),
        },
        gps: GpsQuality {
            fix: element.fix.clone(),
            satellites: element.sat.as_ref().and_then(Scalar::as_u32),
            hdop: element.hdop.as_ref().and_then(Scalar::as_f64),
            vdop: element.vdop.as_ref().and_then(Scalar::as_f64),
            pdop: element.pdop.as_ref().and_then(Scalar::as_f64),
            dgps_age: element.ageofdgpsdata.as_ref().and_then(Scalar::as_f64),
            dgps_id: element.dgpsid.as_ref().and_then(Scalar::as_u32),
        },
    }
}

fn build_route(element: &RouteElement, suppression: &Suppression) -> Route {
    Route {
        name: element.name.clone(),
        points: element
            .points
            .iter()
            .map(|p| build_waypoint(p, suppression))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ExtensionBlock, ExtensionValue, SegmentElement, TrackElement};
    use pretty_assertions::assert_eq;

    const T0: i64 = 1_370_080_800;

    fn timestamp(offset: i64) -> String {
        chrono::DateTime::from_timestamp(T0 + offset, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default()
    }

    fn point(lat: f64, lon: f64, offset: i64, speed: &str) -> PointElement {
        PointElement {
            time: Some(timestamp(offset)),
            desc: Some(speed.to_string()),
            ..PointElement::new(lat, lon)
        }
    }

    fn document(tracks: Vec<Vec<Vec<PointElement>>>) -> GpxDocument {
        GpxDocument {
            creator: Some("test-device".to_string()),
            version: Some("1.1".to_string()),
            tracks: tracks
                .into_iter()
                .enumerate()
                .map(|(t, segments)| TrackElement {
                    name: Some(format!("Track {}", t)),
                    segments: segments
                        .into_iter()
                        .map(|points| SegmentElement { points })
                        .collect(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn three_point_document() -> GpxDocument {
        document(vec![vec![vec![
            point(51.0, -1.0, 0, "10 MPH"),
            point(51.001, -1.0, 10, "10 MPH"),
            point(51.002, -1.0, 20, "20 MPH"),
        ]]])
    }

    fn ingest(document: &GpxDocument, config: IngestConfig) -> Ingested {
        IngestionEngine::new(config)
            .unwrap()
            .ingest(document)
            .unwrap()
    }

    #[test]
    fn test_three_point_scenario() {
        let ingested = ingest(&three_point_document(), IngestConfig::default());
        let journey = &ingested.journey;

        let segment = journey.segment("journey0", "seg0").unwrap();
        assert_eq!(segment.stats.avg_speed, Some(13.33));
        assert_eq!(segment.stats.max_speed, Some(20.0));
        assert_eq!(segment.stats.min_speed, Some(10.0));
        assert_eq!(segment.stats.modal_speed, Some(10.0));
        assert_eq!(segment.stats.duration, Some(20));

        let p0 = journey.point("journey0", "seg0", "trackpt0").unwrap();
        let p1 = journey.point("journey0", "seg0", "trackpt1").unwrap();
        let p2 = journey.point("journey0", "seg0", "trackpt2").unwrap();
        assert_eq!((p0.acceleration, p0.deceleration), (Some(0.0), Some(0.0)));
        assert_eq!((p1.acceleration, p1.deceleration), (Some(0.0), Some(0.0)));
        assert_eq!(p2.acceleration, Some(0.447));
        assert_eq!(p2.deceleration, Some(0.0));

        assert_eq!(segment.stats.time_accelerating, Some(10));
        assert_eq!(segment.stats.time_decelerating, Some(0));
        assert_eq!(segment.stats.time_moving, Some(20));
        assert_eq!(segment.stats.max_acceleration, Some(0.447));
    }

    #[test]
    fn test_identifiers_and_created() {
        let ingested = ingest(&three_point_document(), IngestConfig::default());
        let journey = &ingested.journey;

        assert_eq!(journey.created.creator, "test-device");
        assert_eq!(journey.created.format, "GPX");
        assert_eq!(journey.created.version, "1.1");
        assert_eq!(journey.timezone, "UTC");

        let keys: Vec<&str> = journey
            .segment("journey0", "seg0")
            .unwrap()
            .points
            .keys()
            .collect();
        assert_eq!(keys, vec!["trackpt0", "trackpt1", "trackpt2"]);
        assert_eq!(journey.track("journey0").unwrap().name, "Track 0");
    }

    #[test]
    fn test_smart_track_splits_on_long_gap() {
        let doc = document(vec![vec![vec![
            point(51.0, -1.0, 0, "10 MPH"),
            point(51.1, -1.0, 4000, "30 MPH"),
            point(51.2, -1.0, 4010, "30 MPH"),
        ]]]);
        let ingested = ingest(&doc, IngestConfig::default());
        let journey = &ingested.journey;

        let ids: Vec<&str> = journey.tracks.keys().collect();
        assert_eq!(ids, vec!["journey0", "journey1"]);
        assert_eq!(journey.track("journey0").unwrap().name, "Track 0");
        assert_eq!(journey.track("journey1").unwrap().name, "Track 0-1");

        let first = journey.segment("journey0", "seg0").unwrap();
        let second = journey.segment("journey1", "seg0").unwrap();
        assert_eq!(first.points.len(), 1);
        assert_eq!(second.points.len(), 2);

        // The triggering point starts fresh: no deceleration bridges the gap
        let trigger = journey.point("journey1", "seg0", "trackpt0").unwrap();
        assert_eq!(trigger.acceleration, Some(0.0));
        assert_eq!(trigger.deceleration, Some(0.0));
        assert_eq!(second.stats.duration, Some(10));
        assert_eq!(second.stats.time_stationary, Some(0));
        assert_eq!(second.stats.time_moving, Some(10));

        assert_eq!(journey.stats.tracks, Some(2));
        assert_eq!(journey.stats.segments, Some(2));
        assert_eq!(journey.stats.trackpoints, 3);
        assert_eq!(journey.stats.recorded_duration, Some(10));
        assert_eq!(journey.stats.duration, Some(4010));
    }

    #[test]
    fn test_smart_track_disabled_keeps_one_track() {
        let doc = document(vec![vec![vec![
            point(51.0, -1.0, 0, "10 MPH"),
            point(51.1, -1.0, 4000, "30 MPH"),
        ]]]);
        let mut config = IngestConfig::default();
        config.smart_track.enabled = false;

        let journey = ingest(&doc, config).journey;
        assert_eq!(journey.tracks.len(), 1);
        assert_eq!(journey.stats.duration, Some(4000));
    }

    #[test]
    fn test_split_continues_following_segments_in_new_track() {
        let doc = document(vec![vec![
            vec![
                point(51.0, -1.0, 0, "10 MPH"),
                point(51.1, -1.0, 5000, "10 MPH"),
            ],
            vec![point(51.2, -1.0, 5100, "12 MPH")],
        ]]);
        let ingested = ingest(&doc, IngestConfig::default());

        assert_eq!(ingested.index.track_ids(), vec!["journey0", "journey1"]);
        assert_eq!(
            ingested.index.segment_ids("journey1"),
            Some(vec!["seg0", "seg1"])
        );
        assert_eq!(ingested.journey.stats.segments, Some(3));
    }

    #[test]
    fn test_segment_boundary_resets_context() {
        let doc = document(vec![vec![
            vec![point(51.0, -1.0, 0, "30 MPH"), point(51.0, -1.0, 10, "30 MPH")],
            vec![point(51.0, -1.0, 20, "10 MPH")],
        ]]);
        let journey = ingest(&doc, IngestConfig::default()).journey;

        let first_of_second = journey.point("journey0", "seg1", "trackpt0").unwrap();
        assert_eq!(first_of_second.deceleration, Some(0.0));
        assert_eq!(
            journey.segment("journey0", "seg1").unwrap().stats.time_stationary,
            Some(0)
        );
    }

    #[test]
    fn test_rollup_sums() {
        let mut config = IngestConfig::default();
        config.experimental.calculate_distance = true;

        let doc = document(vec![
            vec![
                vec![point(51.0, -1.0, 0, "10 MPH"), point(51.01, -1.0, 60, "12 MPH")],
                vec![point(51.02, -1.0, 120, "14 MPH"), point(51.03, -1.01, 180, "14 MPH")],
            ],
            vec![vec![
                point(52.0, -1.0, 1000, "5 KPH"),
                point(52.0, -1.02, 1060, "9 KPH"),
                point(52.0, -1.04, 1120, "7 KPH"),
            ]],
        ]);
        let ingested = ingest(&doc, config);
        let journey = &ingested.journey;

        let segment_points: usize = journey
            .tracks
            .values()
            .flat_map(|t| t.segments.values())
            .map(|s| s.stats.trackpoints)
            .sum();
        assert_eq!(journey.stats.trackpoints, segment_points);
        assert_eq!(journey.stats.trackpoints, 7);

        let track_distance: f64 = journey
            .tracks
            .values()
            .filter_map(|t| t.stats.distance_travelled)
            .sum();
        let segment_distance: f64 = journey
            .tracks
            .values()
            .flat_map(|t| t.segments.values())
            .filter_map(|s| s.stats.distance_travelled)
            .sum();
        let total = journey.stats.distance_travelled.unwrap();
        assert!(total > 0.0);
        assert!((total - track_distance).abs() < 0.01);
        assert!((total - segment_distance).abs() < 0.01);

        assert_eq!(journey.stats.speed_uom, vec!["mph".to_string(), "kph".to_string()]);
        assert_eq!(journey.stats.max_speed, Some(14.0));
        assert_eq!(journey.stats.min_speed, Some(5.0));
        assert_eq!(journey.stats.recorded_duration, Some(60 + 60 + 120));
    }

    #[test]
    fn test_distance_disabled_by_default() {
        let journey = ingest(&three_point_document(), IngestConfig::default()).journey;

        assert_eq!(journey.stats.distance_travelled, None);
        let p1 = journey.point("journey0", "seg0", "trackpt1").unwrap();
        assert_eq!(p1.distance, None);
        assert!(!journey.metadata.experimental.calculate_distance);
    }

    #[test]
    fn test_suppression_omits_fields_and_aggregates() {
        let mut config = IngestConfig::default();
        config.suppression.suppress(Category::Speed);
        config.suppression.suppress(Category::Location);

        let journey = ingest(&three_point_document(), config).journey;
        let p0 = journey.point("journey0", "seg0", "trackpt0").unwrap();

        assert_eq!(p0.lat, None);
        assert_eq!(p0.speed, None);
        assert_eq!(p0.acceleration, None);
        assert!(p0.time.is_some());

        assert_eq!(journey.stats.avg_speed, None);
        assert_eq!(journey.stats.bounds, None);
        assert_eq!(journey.stats.time_moving, None);
        assert_eq!(journey.stats.trackpoints, 3);
        assert_eq!(
            journey.metadata.suppression,
            vec![Category::Location, Category::Speed]
        );
    }

    #[test]
    fn test_suppressing_date_disables_smart_track_and_acceleration() {
        let doc = document(vec![vec![vec![
            point(51.0, -1.0, 0, "10 MPH"),
            point(51.1, -1.0, 9000, "30 MPH"),
        ]]]);
        let mut config = IngestConfig::default();
        config.suppression.suppress(Category::Date);

        let journey = ingest(&doc, config).journey;
        assert_eq!(journey.tracks.len(), 1);

        let p1 = journey.point("journey0", "seg0", "trackpt1").unwrap();
        assert_eq!(p1.time, None);
        assert_eq!(p1.acceleration, None);
        assert_eq!(journey.stats.duration, None);
        assert_eq!(journey.stats.avg_speed, Some(20.0));
    }

    #[test]
    fn test_malformed_values_are_recovered_and_counted() {
        let mut bad_time = point(51.0, -1.0, 0, "fast");
        bad_time.time = Some("not a time".to_string());
        bad_time.ele = Some(Scalar::Text("high".to_string()));

        let doc = document(vec![vec![vec![bad_time, point(51.0, -1.0, 10, "10 MPH")]]]);
        let journey = ingest(&doc, IngestConfig::default()).journey;

        assert_eq!(
            journey.metadata.recovered,
            RecoveredCounts {
                timestamps: 1,
                elevations: 1,
                speeds: 1,
            }
        );
        let p0 = journey.point("journey0", "seg0", "trackpt0").unwrap();
        assert_eq!(p0.time, None);
        assert_eq!(p0.speed, Some(0.0));
        assert_eq!(p0.elevation, None);
        assert_eq!(journey.stats.start, Some(T0 + 10));
    }

    #[test]
    fn test_out_of_range_epochs_are_recovered() {
        let mut latest = point(51.0, -1.0, 0, "10 MPH");
        latest.time = Some(i64::MAX.to_string());
        let mut earliest = point(51.0, -1.0, 0, "12 MPH");
        earliest.time = Some(i64::MIN.to_string());

        let doc = document(vec![vec![vec![latest, earliest, point(51.0, -1.0, 30, "12 MPH")]]]);
        let journey = ingest(&doc, IngestConfig::default()).journey;

        assert_eq!(journey.metadata.recovered.timestamps, 2);
        assert_eq!(journey.tracks.len(), 1);
        assert_eq!(journey.stats.start, Some(T0 + 30));
        assert_eq!(journey.stats.duration, Some(0));
    }

    #[test]
    fn test_elevation_stats() {
        let mut points = vec![
            point(51.0, -1.0, 0, "10 MPH"),
            point(51.0, -1.0, 10, "10 MPH"),
            point(51.0, -1.0, 20, "10 MPH"),
        ];
        points[0].ele = Some(Scalar::Number(100.0));
        points[1].ele = Some(Scalar::Text("104".to_string()));
        points[2].ele = Some(Scalar::Number(101.0));

        let journey = ingest(&document(vec![vec![points]]), IngestConfig::default()).journey;
        let p2 = journey.point("journey0", "seg0", "trackpt2").unwrap();
        assert_eq!(p2.elevation_change, Some(-3.0));

        let elevation = journey.stats.elevation.unwrap();
        assert_eq!(elevation.min, 100.0);
        assert_eq!(elevation.max, 104.0);
        // (0 + 4 - 3) / 3
        assert_eq!(elevation.avg_change, 0.33);
    }

    #[test]
    fn test_auto_calculated_speed() {
        let mut config = IngestConfig::default();
        config.experimental.calculate_distance = true;

        let mut first = PointElement::new(0.0, 0.0);
        first.time = Some(timestamp(0));
        let mut second = PointElement::new(1.0, 0.0);
        second.time = Some(timestamp(3600));

        config.smart_track.threshold = 7200;

        let journey = ingest(&document(vec![vec![vec![first, second]]]), config).journey;
        let p1 = journey.point("journey0", "seg0", "trackpt1").unwrap();

        // One degree of latitude in an hour is 69.09 mph
        assert_eq!(p1.speed, Some(69.09));
        assert_eq!(p1.speed_uom.as_deref(), Some("mph"));
        assert!(p1.speed_auto);
        assert!(journey.metadata.auto_calc.speed);

        let p0 = journey.point("journey0", "seg0", "trackpt0").unwrap();
        assert_eq!(p0.speed, Some(0.0));
        assert!(!p0.speed_auto);
    }

    #[test]
    fn test_extensions_grouped_by_namespace() {
        let mut p = point(51.0, -1.0, 0, "10 MPH");
        p.extensions = vec![
            ExtensionBlock {
                namespace: "gpxtpx".to_string(),
                values: vec![ExtensionValue {
                    name: "hr".to_string(),
                    value: "142".to_string(),
                }],
            },
            ExtensionBlock {
                namespace: "gpxtpx".to_string(),
                values: vec![ExtensionValue {
                    name: "cad".to_string(),
                    value: "88".to_string(),
                }],
            },
        ];

        let journey = ingest(&document(vec![vec![vec![p]]]), IngestConfig::default()).journey;
        let extensions = &journey.point("journey0", "seg0", "trackpt0").unwrap().extensions;
        let gpxtpx = extensions.get("gpxtpx").unwrap();
        assert_eq!(extensions.len(), 1);
        assert_eq!(gpxtpx.get("hr").map(String::as_str), Some("142"));
        assert_eq!(gpxtpx.get("cad").map(String::as_str), Some("88"));
    }

    #[test]
    fn test_waypoints_and_routes() {
        let mut doc = three_point_document();
        let mut waypoint = WaypointElement::new(51.5, -0.12);
        waypoint.name = Some("Start".to_string());
        waypoint.ele = Some(Scalar::Number(12.5));
        waypoint.time = Some(timestamp(0));
        waypoint.sat = Some(Scalar::Text("7".to_string()));
        waypoint.hdop = Some(Scalar::Number(1.2));
        waypoint.kind = Some("Flag".to_string());
        doc.waypoints.push(waypoint.clone());
        doc.routes.push(RouteElement {
            name: Some("Out".to_string()),
            points: vec![waypoint],
        });

        let mut config = IngestConfig::default();
        config.suppression.suppress(Category::Elevation);
        let journey = ingest(&doc, config).journey;

        assert_eq!(journey.waypoints.len(), 1);
        let w = &journey.waypoints[0];
        assert_eq!(w.name.as_deref(), Some("Start"));
        assert_eq!(w.position.lat.as_deref(), Some("51.5"));
        assert_eq!(w.position.elevation, None);
        assert_eq!(w.meta.time, Some(T0));
        assert_eq!(w.meta.kind.as_deref(), Some("Flag"));
        assert_eq!(w.gps.satellites, Some(7));
        assert_eq!(w.gps.hdop, Some(1.2));

        assert_eq!(journey.routes[0].name.as_deref(), Some("Out"));
        assert_eq!(journey.routes[0].points.len(), 1);
    }

    #[test]
    fn test_invalid_input_fails_fast() {
        let result = IngestionEngine::default().ingest(&GpxDocument::default());
        assert!(matches!(result, Err(IngestError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_segment_is_degenerate() {
        let doc = document(vec![vec![vec![point(51.0, -1.0, 0, "10 MPH")], vec![]]]);
        let result = IngestionEngine::default().ingest(&doc);

        match result {
            Err(IngestError::DegenerateAggregate { scope, aggregate }) => {
                assert_eq!(
                    scope,
                    Scope::Segment {
                        track: "journey0".to_string(),
                        segment: "seg1".to_string()
                    }
                );
                assert_eq!(aggregate, "avg_speed");
            }
            other => panic!("expected degenerate aggregate, got {:?}", other),
        }
    }

    #[test]
    fn test_index_matches_output() {
        let doc = document(vec![
            vec![vec![point(51.0, -1.0, 0, "1 MPH")], vec![point(51.0, -1.0, 5, "1 MPH")]],
            vec![vec![point(51.0, -1.0, 10, "1 MPH"), point(51.0, -1.0, 15, "2 MPH")]],
        ]);
        let ingested = ingest(&doc, IngestConfig::default());

        assert_eq!(JourneyIndex::from_journey(&ingested.journey), ingested.index);
        assert_eq!(ingested.index.point_count("journey1", "seg0"), Some(2));
    }
}
