//! Ingestion policy
//!
//! Everything that changes what an ingestion pass computes lives here:
//! - SmartTrack segmentation (split a track on long time gaps)
//! - Field suppression by category
//! - Experimental capability flags
//!
//! `IngestConfig` bundles all three and is echoed into the output metadata.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default SmartTrack gap threshold in seconds
pub const DEFAULT_SMART_TRACK_THRESHOLD: u64 = 3600;

/// Default timezone label recorded in the journey
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Time-gap track splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartTrack {
    pub enabled: bool,
    /// Gap in seconds above which a new track is started
    pub threshold: u64,
}

impl Default for SmartTrack {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_SMART_TRACK_THRESHOLD,
        }
    }
}

impl SmartTrack {
    /// Decide whether the incoming point must open a new track.
    ///
    /// `entry_period` is the time since `last_time`; a point with no previous
    /// timestamp in the current context never triggers a split.
    pub fn should_split(&self, last_time: Option<i64>, entry_period: i64) -> bool {
        // Thresholds beyond any representable gap never trigger
        let beyond_threshold = i64::try_from(self.threshold).map_or(false, |t| entry_period > t);
        self.enabled && last_time.is_some() && beyond_threshold
    }
}

/// Suppressible field category. Declaration order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Location,
    Speed,
    Elevation,
    Date,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Location => "location",
            Category::Speed => "speed",
            Category::Elevation => "elevation",
            Category::Date => "date",
        }
    }
}

/// Set of suppressed categories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Suppression {
    categories: BTreeSet<Category>,
}

impl Suppression {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn suppress(&mut self, category: Category) {
        self.categories.insert(category);
    }

    pub fn unsuppress(&mut self, category: Category) {
        self.categories.remove(&category);
    }

    pub fn is_suppressed(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    pub fn allows(&self, category: Category) -> bool {
        !self.is_suppressed(category)
    }

    /// Suppressed categories in reporting order: location, speed, elevation, date
    pub fn categories(&self) -> Vec<Category> {
        self.categories.iter().copied().collect()
    }
}

/// Experimental capabilities, all off by default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentalFeatures {
    /// Great-circle distance between consecutive points
    pub calculate_distance: bool,
}

/// Complete configuration for one ingestion pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub smart_track: SmartTrack,
    pub suppression: Suppression,
    pub experimental: ExperimentalFeatures,
    pub timezone: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            smart_track: SmartTrack::default(),
            suppression: Suppression::none(),
            experimental: ExperimentalFeatures::default(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

impl IngestConfig {
    /// Load a (possibly partial) configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, IngestError> {
        let config: IngestConfig = serde_json::from_str(json)
            .map_err(|e| IngestError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.smart_track.threshold == 0 {
            return Err(IngestError::InvalidConfig(
                "smart track threshold must be a positive number of seconds".to_string(),
            ));
        }
        Ok(())
    }

    /// Distance is only computed when the capability is on and locations are kept
    pub fn distance_enabled(&self) -> bool {
        self.experimental.calculate_distance && self.suppression.allows(Category::Location)
    }
}
