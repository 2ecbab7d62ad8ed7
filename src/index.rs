//! Track/segment index
//!
//! A lightweight view of an ingested journey: track ids and names, and the
//! point count of every segment. The engine builds it while ingesting; it can
//! also be rebuilt from a saved output graph without re-deriving any stats.

use crate::types::{Journey, OrderedMap};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub name: String,
    /// Segment id -> point count
    pub segments: OrderedMap<usize>,
}

/// Id and display name of one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackName {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JourneyIndex {
    tracks: OrderedMap<TrackEntry>,
}

impl JourneyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from an output graph
    pub fn from_journey(journey: &Journey) -> Self {
        let mut index = Self::new();
        for (track_id, track) in journey.tracks.iter() {
            index.register_track(track_id, &track.name);
            for (segment_id, segment) in track.segments.iter() {
                index.record_segment(track_id, segment_id, segment.points.len());
            }
        }
        index
    }

    pub fn register_track(&mut self, id: &str, name: &str) {
        self.tracks.insert(
            id,
            TrackEntry {
                name: name.to_string(),
                segments: OrderedMap::new(),
            },
        );
    }

    /// Record a closed segment under an already registered track
    pub fn record_segment(&mut self, track: &str, segment: &str, points: usize) {
        if let Some(entry) = self.tracks.get_mut(track) {
            entry.segments.insert(segment, points);
        }
    }

    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks.keys().collect()
    }

    pub fn track_names(&self) -> Vec<TrackName> {
        self.tracks
            .iter()
            .map(|(id, entry)| TrackName {
                id: id.to_string(),
                name: entry.name.clone(),
            })
            .collect()
    }

    pub fn track_name(&self, track: &str) -> Option<&str> {
        self.tracks.get(track).map(|entry| entry.name.as_str())
    }

    pub fn segment_ids(&self, track: &str) -> Option<Vec<&str>> {
        self.tracks
            .get(track)
            .map(|entry| entry.segments.keys().collect())
    }

    pub fn point_count(&self, track: &str, segment: &str) -> Option<usize> {
        self.tracks.get(track)?.segments.get(segment).copied()
    }

    pub fn total_points(&self) -> usize {
        self.tracks
            .values()
            .flat_map(|entry| entry.segments.values())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
