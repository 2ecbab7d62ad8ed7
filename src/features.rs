//! Derived-value calculators
//!
//! Each calculator is a function of the carried context plus the current
//! point, and updates the context for the next call:
//! - Elevation change since the previous point
//! - Great-circle distance (experimental)
//! - Acceleration / deceleration from consecutive speeds
//! - Speed derived from distance when the document carries none

use crate::context::DerivationContext;
use crate::normalizer::{round_to, to_metres_per_second};

/// Statute miles per nautical mile
const MILES_PER_NAUTICAL_MILE: f64 = 1.1515;
const FEET_PER_MILE: f64 = 5280.0;
const MINUTES_PER_DEGREE: f64 = 60.0;

/// Elevation change relative to the previous point that had an elevation.
///
/// Zero for the first elevation seen in the current context.
pub fn elevation_change(ctx: &mut DerivationContext, elevation: f64) -> f64 {
    let change = match ctx.last_elevation {
        Some(previous) => round_to(elevation - previous, 2),
        None => 0.0,
    };
    ctx.last_elevation = Some(elevation);
    change
}

/// Great-circle distance in feet between two (lat, lon) positions in degrees,
/// using the spherical law of cosines. Rounded to 3 decimal places.
///
/// Identical points are 0 outright. Rounding can push the cosine just outside
/// [-1, 1]; the resulting NaN is reported as 0.
pub fn great_circle_feet(from: (f64, f64), to: (f64, f64)) -> f64 {
    if from == to {
        return 0.0;
    }
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;
    let theta = lon1 - lon2;

    let cosine = lat1.to_radians().sin() * lat2.to_radians().sin()
        + lat1.to_radians().cos() * lat2.to_radians().cos() * theta.to_radians().cos();
    arc_feet(cosine)
}

/// Feet along the arc whose central angle has the given cosine. A cosine
/// outside [-1, 1] has no angle and yields 0.
fn arc_feet(cosine: f64) -> f64 {
    let degrees = cosine.acos().to_degrees();
    let feet = degrees * MINUTES_PER_DEGREE * MILES_PER_NAUTICAL_MILE * FEET_PER_MILE;

    if feet.is_finite() {
        round_to(feet, 3)
    } else {
        0.0
    }
}

/// Distance in feet from the previous position, or 0 when disabled or when
/// this is the first position in the current context.
pub fn distance(ctx: &mut DerivationContext, position: (f64, f64), enabled: bool) -> f64 {
    let travelled = match (enabled, ctx.last_position) {
        (true, Some(previous)) => great_circle_feet(previous, position),
        _ => 0.0,
    };
    ctx.last_position = Some(position);
    travelled
}

/// Signed-split change in speed for one point
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Acceleration {
    /// m/s², 0 unless speed rose
    pub acceleration: f64,
    /// m/s² as a positive magnitude, 0 unless speed fell
    pub deceleration: f64,
    /// Seconds credited to "time accelerating"
    pub accelerating_secs: i64,
    /// Seconds credited to "time decelerating"
    pub decelerating_secs: i64,
}

/// Acceleration or deceleration since the previous point.
///
/// Both are 0 when there is no previous timestamp or speed, when the speed is
/// unchanged, or when no time has elapsed. A point is never both accelerating
/// and decelerating.
pub fn acceleration(ctx: &mut DerivationContext, magnitude: f64, unit: &str) -> Acceleration {
    let speed_ms = to_metres_per_second(magnitude, unit);
    let period = ctx.entry_period;

    let result = match (ctx.last_time, ctx.last_speed_ms, ctx.last_raw_speed) {
        (Some(_), Some(previous_ms), Some(previous_raw))
            if previous_raw != magnitude && period > 0 =>
        {
            let delta = (speed_ms - previous_ms) / period as f64;
            if delta < 0.0 {
                Acceleration {
                    deceleration: round_to(-delta, 4),
                    decelerating_secs: period,
                    ..Default::default()
                }
            } else {
                Acceleration {
                    acceleration: round_to(delta, 4),
                    accelerating_secs: if delta != 0.0 { period } else { 0 },
                    ..Default::default()
                }
            }
        }
        _ => Acceleration::default(),
    };

    ctx.last_speed_ms = Some(speed_ms);
    ctx.last_raw_speed = Some(magnitude);
    result
}

/// Speed in mph derived from distance (feet) over the entry period
pub fn auto_speed_mph(distance_feet: f64, period: i64) -> Option<f64> {
    if period <= 0 {
        return None;
    }
    let feet_per_second = distance_feet / period as f64;
    Some(round_to(feet_per_second * 3600.0 / FEET_PER_MILE, 2))
}
