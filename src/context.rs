//! Carried derivation context
//!
//! Several per-point values depend on the point before it: elevation change,
//! distance, acceleration and the entry period itself. The "last seen" values
//! live in a `DerivationContext` that the engine owns for one ingestion pass
//! and resets at every segment boundary, including SmartTrack splits.

/// Last-seen values within the current segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivationContext {
    /// Timestamp of the previous dated point (epoch seconds)
    pub last_time: Option<i64>,
    /// Speed magnitude of the previous point, as read
    pub last_raw_speed: Option<f64>,
    /// Speed of the previous point in metres per second
    pub last_speed_ms: Option<f64>,
    /// (lat, lon) of the previous point in degrees
    pub last_position: Option<(f64, f64)>,
    /// Elevation of the most recent point that had one
    pub last_elevation: Option<f64>,
    /// Seconds between the current point and `last_time`
    pub entry_period: i64,
}

impl DerivationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; the next point starts fresh
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Compute and store the entry period for a point at `time`.
    ///
    /// Zero when either the point or its predecessor has no timestamp.
    pub fn begin_point(&mut self, time: Option<i64>) -> i64 {
        self.entry_period = match (self.last_time, time) {
            (Some(last), Some(now)) => now.saturating_sub(last),
            _ => 0,
        };
        self.entry_period
    }

    /// Record the timestamp of the point just processed
    pub fn finish_point(&mut self, time: Option<i64>) {
        if time.is_some() {
            self.last_time = time;
        }
    }

    pub fn is_fresh(&self) -> bool {
        *self == Self::default()
    }
}
