//! Bucket downsampling for plot series.
//!
//! The input is split into `max_points` contiguous buckets of
//! `ceil(len / max_points)` points each and one representative is kept per
//! bucket: the point whose `y` deviates most (in absolute value) from the
//! bucket's first point. Spikes and dips inside a bucket therefore survive,
//! which is what matters for monitoring traces. Ties keep the earliest point;
//! a NaN deviation never wins, so a bucket of NaNs yields its first point.

use crate::error::{EngineError, Result};
use serde::Serialize;

/// A plot-ready point. `x` is a time coordinate (milliseconds), `y` the value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
}

impl PlotPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Reduces `points` to at most `max_points`, keeping their order.
///
/// Inputs that already fit are returned unchanged; this makes the reduction
/// idempotent.
pub fn reduce(points: &[PlotPoint], max_points: usize) -> Result<Vec<PlotPoint>> {
    if max_points == 0 {
        return Err(EngineError::invalid("max_points must be at least 1"));
    }
    if points.len() <= max_points {
        return Ok(points.to_vec());
    }

    let bucket_width = points.len().div_ceil(max_points);
    Ok(points
        .chunks(bucket_width)
        .filter_map(representative)
        .collect())
}

/// Point of `bucket` with the largest absolute deviation from its first point.
fn representative(bucket: &[PlotPoint]) -> Option<PlotPoint> {
    let first = *bucket.first()?;
    let mut best = first;
    let mut best_deviation = 0.0f64;

    for point in &bucket[1..] {
        let deviation = (point.y - first.y).abs();
        if deviation > best_deviation {
            best = *point;
            best_deviation = deviation;
        }
    }
    Some(best)
}
