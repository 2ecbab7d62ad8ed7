//! Pipeline orchestration
//!
//! This module provides the public API for gpx-ingest.
//! It orchestrates the full pipeline from a parsed document tree to the
//! journey output graph.

#[cfg(feature = "gpx")]
use crate::adapters::GpxXmlAdapter;
use crate::adapters::{DocumentAdapter, TreeJsonAdapter};
use crate::encoder::JourneyEncoder;
use crate::engine::{Ingested, IngestionEngine};
use crate::error::IngestError;
use crate::index::{JourneyIndex, TrackName};
use crate::policy::{Category, IngestConfig, SmartTrack};
use crate::schema::GpxDocument;
use crate::types::{Journey, Point, Segment, Stats, Track};

/// Ingest a parsed document tree into a journey.
///
/// # Example
/// ```ignore
/// let journey = ingest_document(&document, &IngestConfig::default())?;
/// println!("{:?}", journey.stats.avg_speed);
/// ```
pub fn ingest_document(document: &GpxDocument, config: &IngestConfig) -> Result<Journey, IngestError> {
    let engine = IngestionEngine::new(config.clone())?;
    Ok(engine.ingest(document)?.journey)
}

/// Convert a document tree encoded as JSON into the journey JSON.
///
/// Pipeline stages:
/// 1. TreeJsonAdapter - Parse the tree
/// 2. IngestionEngine - Derive per-point values and roll up stats
/// 3. JourneyEncoder - Encode to JSON
pub fn ingest_tree_json(raw_json: String, config: &IngestConfig) -> Result<String, IngestError> {
    process_document(&TreeJsonAdapter, &raw_json, config)
}

/// Ingest GPX XML into a journey
#[cfg(feature = "gpx")]
pub fn ingest_gpx(raw_xml: &str, config: &IngestConfig) -> Result<Journey, IngestError> {
    let document = GpxXmlAdapter.parse(raw_xml)?;
    ingest_document(&document, config)
}

fn process_document(
    adapter: &dyn DocumentAdapter,
    raw: &str,
    config: &IngestConfig,
) -> Result<String, IngestError> {
    let document = adapter.parse(raw)?;
    let journey = ingest_document(&document, config)?;
    JourneyEncoder::new().encode_to_json(&journey)
}

/// Stateful processor holding the most recent journey for querying.
///
/// Configuration changes apply to the next ingestion; the journey already held
/// is left untouched.
#[derive(Debug, Clone)]
pub struct GpxProcessor {
    config: IngestConfig,
    encoder: JourneyEncoder,
    journey: Option<Journey>,
    index: JourneyIndex,
}

impl Default for GpxProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl GpxProcessor {
    /// Create a processor with default settings
    pub fn new() -> Self {
        Self {
            config: IngestConfig::default(),
            encoder: JourneyEncoder::new(),
            journey: None,
            index: JourneyIndex::new(),
        }
    }

    /// Create a processor with a specific configuration
    pub fn with_config(config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest a parsed document, replacing any journey already held.
    ///
    /// On failure the previously held journey is kept.
    pub fn ingest(&mut self, document: &GpxDocument) -> Result<&Journey, IngestError> {
        let Ingested { journey, index } = IngestionEngine::new(self.config.clone())?.ingest(document)?;
        self.index = index;
        Ok(self.journey.insert(journey))
    }

    /// Ingest a document tree encoded as JSON
    pub fn ingest_tree_json(&mut self, raw_json: &str) -> Result<&Journey, IngestError> {
        let document = TreeJsonAdapter.parse(raw_json)?;
        self.ingest(&document)
    }

    /// Ingest GPX XML
    #[cfg(feature = "gpx")]
    pub fn ingest_gpx(&mut self, raw_xml: &str) -> Result<&Journey, IngestError> {
        let document = GpxXmlAdapter.parse(raw_xml)?;
        self.ingest(&document)
    }

    /// Load a previously encoded journey and rebuild the index from it
    pub fn load_json(&mut self, json: &str) -> Result<&Journey, IngestError> {
        let journey = self.encoder.decode(json)?;
        self.index = JourneyIndex::from_journey(&journey);
        Ok(self.journey.insert(journey))
    }

    /// Drop the held journey and index. Configuration is kept.
    pub fn reset(&mut self) {
        self.journey = None;
        self.index = JourneyIndex::new();
    }

    /// Encode the held journey to JSON
    pub fn to_json(&self) -> Result<String, IngestError> {
        self.encoder.encode_to_json(self.held()?)
    }

    pub fn journey(&self) -> Option<&Journey> {
        self.journey.as_ref()
    }

    pub fn index(&self) -> &JourneyIndex {
        &self.index
    }

    pub fn track_ids(&self) -> Vec<&str> {
        self.index.track_ids()
    }

    pub fn track_names(&self) -> Vec<TrackName> {
        self.index.track_names()
    }

    pub fn segment_ids(&self, track: &str) -> Option<Vec<&str>> {
        self.index.segment_ids(track)
    }

    pub fn point_ids(&self, track: &str, segment: &str) -> Option<Vec<&str>> {
        self.segment(track, segment)
            .map(|segment| segment.points.keys().collect())
    }

    /// Point count of one segment, or of the whole track when no segment is named
    pub fn point_count(&self, track: &str, segment: Option<&str>) -> Option<usize> {
        match segment {
            Some(segment) => self.index.point_count(track, segment),
            None => self.track(track).map(|t| t.stats.trackpoints),
        }
    }

    pub fn total_point_count(&self) -> usize {
        self.index.total_points()
    }

    /// Document creation time (epoch seconds)
    pub fn gpx_time(&self) -> Option<i64> {
        self.journey.as_ref()?.created.time
    }

    pub fn timezone(&self) -> Option<&str> {
        self.journey.as_ref().map(|j| j.timezone.as_str())
    }

    pub fn journey_stats(&self) -> Option<&Stats> {
        self.journey.as_ref().map(|j| &j.stats)
    }

    pub fn total_avg_speed(&self) -> Option<f64> {
        self.journey_stats()?.avg_speed
    }

    /// Stats for a track, or for one of its segments
    pub fn stats(&self, track: &str, segment: Option<&str>) -> Option<&Stats> {
        match segment {
            Some(segment) => self.segment(track, segment).map(|s| &s.stats),
            None => self.track(track).map(|t| &t.stats),
        }
    }

    pub fn avg_speed(&self, track: &str, segment: Option<&str>) -> Option<f64> {
        self.stats(track, segment)?.avg_speed
    }

    pub fn journey_start(&self) -> Option<i64> {
        self.journey_stats()?.start
    }

    pub fn journey_end(&self) -> Option<i64> {
        self.journey_stats()?.end
    }

    pub fn track(&self, track: &str) -> Option<&Track> {
        self.journey.as_ref()?.track(track)
    }

    pub fn segment(&self, track: &str, segment: &str) -> Option<&Segment> {
        self.journey.as_ref()?.segment(track, segment)
    }

    pub fn point(&self, track: &str, segment: &str, point: &str) -> Option<&Point> {
        self.journey.as_ref()?.point(track, segment, point)
    }

    /// Stop recording a category of fields from the next ingestion on
    pub fn suppress(&mut self, category: Category) {
        self.config.suppression.suppress(category);
    }

    pub fn unsuppress(&mut self, category: Category) {
        self.config.suppression.unsuppress(category);
    }

    pub fn set_smart_track(&mut self, enabled: bool, threshold: u64) -> Result<(), IngestError> {
        let smart_track = SmartTrack { enabled, threshold };
        let mut config = self.config.clone();
        config.smart_track = smart_track;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_distance_calculation(&mut self, enabled: bool) {
        self.config.experimental.calculate_distance = enabled;
    }

    fn held(&self) -> Result<&Journey, IngestError> {
        self.journey.as_ref().ok_or(IngestError::NotIngested)
    }
}
