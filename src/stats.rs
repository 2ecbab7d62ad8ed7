//! Stats finalization
//!
//! Reduces an `Accumulator` into the `Stats` block for its scope. The same
//! reduction runs at segment, track and journey level; only the child counters
//! differ.
//!
//! Speed and bounding-box aggregates are fed by every point that is not
//! suppressed, so an empty scope is an error for them rather than a silent 0 or
//! NaN. Aggregates over optional per-point data (timestamps, elevation,
//! acceleration) are simply absent when no point carried the value.

use crate::accumulator::Accumulator;
use crate::error::{IngestError, Scope};
use crate::normalizer::round_to;
use crate::policy::{Category, IngestConfig};
use crate::types::{Bounds, ElevationStats, Range, Stats};
use std::collections::HashMap;

/// Level of the rollup tree a stats block belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Segment,
    Track,
    Journey,
}

/// Compute the stats block for one scope
pub fn finalize(
    acc: &Accumulator,
    scope: &Scope,
    level: Level,
    config: &IngestConfig,
) -> Result<Stats, IngestError> {
    let reducer = Reducer { scope };
    let suppression = &config.suppression;

    let mut stats = Stats {
        trackpoints: acc.point_count,
        ..Default::default()
    };

    match level {
        Level::Segment => {}
        Level::Track => stats.segments = Some(acc.segments),
        Level::Journey => {
            stats.segments = Some(acc.segments);
            stats.tracks = Some(acc.tracks);
        }
    }

    let dated = suppression.allows(Category::Date);
    if dated {
        if let (Some(start), Some(end)) = (acc.times.iter().min(), acc.times.iter().max()) {
            stats.start = Some(*start);
            stats.end = Some(*end);
            stats.duration = Some(end.saturating_sub(*start));
        }
        stats.recorded_duration = match level {
            Level::Segment => stats.duration,
            Level::Track | Level::Journey => Some(acc.recorded_duration),
        };
    }

    if suppression.allows(Category::Speed) {
        stats.avg_speed = Some(round_to(reducer.mean("avg_speed", &acc.speeds)?, 2));
        stats.min_speed = Some(reducer.min("min_speed", &acc.speeds)?);
        stats.max_speed = Some(reducer.max("max_speed", &acc.speeds)?);
        stats.modal_speed = Some(reducer.mode("modal_speed", &acc.speeds)?);
        stats.speed_uom = acc.speed_units.clone();

        if dated {
            stats.avg_acceleration = mean(&acc.accelerations).map(|v| round_to(v, 4));
            stats.min_acceleration = min(&acc.accelerations);
            stats.max_acceleration = max(&acc.accelerations);
            stats.avg_deceleration = mean(&acc.decelerations).map(|v| round_to(v, 4));
            stats.min_deceleration = min(&acc.decelerations);
            stats.max_deceleration = max(&acc.decelerations);

            stats.time_moving = Some(acc.time_moving);
            stats.time_stationary = Some(acc.time_stationary);
            stats.time_accelerating = Some(acc.time_accelerating);
            stats.time_decelerating = Some(acc.time_decelerating);
        }
    }

    if config.distance_enabled() {
        stats.distance_travelled = Some(round_to(acc.distances.iter().sum(), 3));
    }

    if suppression.allows(Category::Elevation) {
        if let (Some(low), Some(high)) = (min(&acc.elevations), max(&acc.elevations)) {
            stats.elevation = Some(ElevationStats {
                min: low,
                max: high,
                avg_change: mean(&acc.elevation_changes)
                    .map(|v| round_to(v, 2))
                    .unwrap_or(0.0),
            });
        }
    }

    if suppression.allows(Category::Location) {
        stats.bounds = Some(Bounds {
            lat: Range {
                min: reducer.min("bounds", &acc.latitudes)?,
                max: reducer.max("bounds", &acc.latitudes)?,
            },
            lon: Range {
                min: reducer.min("bounds", &acc.longitudes)?,
                max: reducer.max("bounds", &acc.longitudes)?,
            },
        });
    }

    Ok(stats)
}

/// Most frequent value. Ties go to the value seen first.
pub fn modal_value(values: &[f64]) -> Option<f64> {
    let mut order: Vec<(f64, usize)> = Vec::new();
    let mut positions: HashMap<u64, usize> = HashMap::new();

    for &value in values {
        // +0.0 and -0.0 count as the same speed
        let key = if value == 0.0 { 0 } else { value.to_bits() };
        match positions.get(&key) {
            Some(&index) => order[index].1 += 1,
            None => {
                positions.insert(key, order.len());
                order.push((value, 1));
            }
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for (value, count) in order {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Reductions that must not run over an empty collection
struct Reducer<'a> {
    scope: &'a Scope,
}

impl Reducer<'_> {
    fn degenerate(&self, aggregate: &'static str) -> IngestError {
        IngestError::DegenerateAggregate {
            scope: self.scope.clone(),
            aggregate,
        }
    }

    fn mean(&self, aggregate: &'static str, values: &[f64]) -> Result<f64, IngestError> {
        mean(values).ok_or_else(|| self.degenerate(aggregate))
    }

    fn min(&self, aggregate: &'static str, values: &[f64]) -> Result<f64, IngestError> {
        min(values).ok_or_else(|| self.degenerate(aggregate))
    }

    fn max(&self, aggregate: &'static str, values: &[f64]) -> Result<f64, IngestError> {
        max(values).ok_or_else(|| self.degenerate(aggregate))
    }

    fn mode(&self, aggregate: &'static str, values: &[f64]) -> Result<f64, IngestError> {
        modal_value(values).ok_or_else(|| self.degenerate(aggregate))
    }
}
