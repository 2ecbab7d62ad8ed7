//! Scope accumulators
//!
//! One ingestion pass keeps three accumulators of the same shape open at once:
//! the segment being built, the track that owns it, and the journey. Every
//! point is recorded into all three, so each scope sees every point beneath it
//! and the stats for each level are reduced from the raw samples rather than
//! from already-rounded child stats.

/// Values derived for one point, ready to be recorded.
///
/// `None` means the category was suppressed or the value was missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSample {
    pub speed: Option<f64>,
    pub speed_unit: Option<String>,
    pub time: Option<i64>,
    pub elevation: Option<f64>,
    pub elevation_change: Option<f64>,
    pub distance: Option<f64>,
    pub position: Option<(f64, f64)>,
    pub acceleration: f64,
    pub deceleration: f64,
    pub moving_secs: i64,
    pub stationary_secs: i64,
    pub accelerating_secs: i64,
    pub decelerating_secs: i64,
}

/// Running lists and totals for one scope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    pub point_count: usize,
    pub speeds: Vec<f64>,
    /// Distinct units in first-seen order
    pub speed_units: Vec<String>,
    pub times: Vec<i64>,
    pub elevations: Vec<f64>,
    pub elevation_changes: Vec<f64>,
    pub distances: Vec<f64>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    /// Non-zero accelerations only
    pub accelerations: Vec<f64>,
    /// Non-zero decelerations only
    pub decelerations: Vec<f64>,
    pub time_moving: i64,
    pub time_stationary: i64,
    pub time_accelerating: i64,
    pub time_decelerating: i64,
    /// Sum of closed child durations
    pub recorded_duration: i64,
    /// Closed segments beneath this scope
    pub segments: usize,
    /// Closed tracks beneath this scope
    pub tracks: usize,
}

/// Accumulator for the segment currently being built
pub type SegmentAccumulator = Accumulator;
/// Accumulator for the track currently being built
pub type TrackAccumulator = Accumulator;
/// Accumulator for the whole journey
pub type JourneyAccumulator = Accumulator;

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add one point's derived values
    pub fn record(&mut self, sample: &PointSample) {
        self.point_count += 1;

        if let Some(speed) = sample.speed {
            self.speeds.push(speed);
        }
        if let Some(unit) = sample.speed_unit.as_deref() {
            if !unit.is_empty() && !self.speed_units.iter().any(|u| u == unit) {
                self.speed_units.push(unit.to_string());
            }
        }
        if let Some(time) = sample.time {
            self.times.push(time);
        }
        if let Some(elevation) = sample.elevation {
            self.elevations.push(elevation);
        }
        if let Some(change) = sample.elevation_change {
            self.elevation_changes.push(change);
        }
        if let Some(distance) = sample.distance {
            self.distances.push(distance);
        }
        if let Some((lat, lon)) = sample.position {
            self.latitudes.push(lat);
            self.longitudes.push(lon);
        }
        if sample.acceleration > 0.0 {
            self.accelerations.push(sample.acceleration);
        }
        if sample.deceleration > 0.0 {
            self.decelerations.push(sample.deceleration);
        }

        self.time_moving = self.time_moving.saturating_add(sample.moving_secs);
        self.time_stationary = self.time_stationary.saturating_add(sample.stationary_secs);
        self.time_accelerating = self.time_accelerating.saturating_add(sample.accelerating_secs);
        self.time_decelerating = self.time_decelerating.saturating_add(sample.decelerating_secs);
    }

    /// Roll a closed segment's duration into this scope
    pub fn absorb_segment(&mut self, duration: Option<i64>) {
        self.segments += 1;
        self.recorded_duration = self.recorded_duration.saturating_add(duration.unwrap_or(0));
    }

    /// Roll a closed track into this scope
    pub fn absorb_track(&mut self, recorded_duration: Option<i64>, segments: usize) {
        self.tracks += 1;
        self.segments += segments;
        self.recorded_duration = self
            .recorded_duration
            .saturating_add(recorded_duration.unwrap_or(0));
    }
}
