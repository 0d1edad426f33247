//! Lifts 2D geometries into 3D for rendering.
//!
//! Vertices that already carry an altitude are never overwritten.

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::geodesy::cumulative_lengths_m;
use geojson::Geometry;

use crate::geometry::{line_positions, line_string, map_positions, Position};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ElevationSpec {
    Constant { meters: f64 },
    Range { start: f64, end: f64 },
    /// Per edge, between the altitudes of its end nodes.
    Nodes,
}

impl ElevationSpec {
    pub fn validate(&self) -> NavResult<()> {
        let ok = match *self {
            ElevationSpec::Constant { meters } => meters.is_finite(),
            ElevationSpec::Range { start, end } => start.is_finite() && end.is_finite(),
            ElevationSpec::Nodes => true,
        };
        if ok {
            Ok(())
        } else {
            Err(NavError::invalid("elevation values must be finite"))
        }
    }
}

/// Every coordinate tuple gets `meters`.
pub fn with_constant(geometry: &Geometry, meters: f64) -> Geometry {
    map_positions(geometry, |p| p.or_alt(meters))
}

/// Line strings are interpolated from `start` to `end`; points take `start`;
/// other kinds fall back to the constant rule with `start`.
pub fn with_range(geometry: &Geometry, start: f64, end: f64) -> Geometry {
    match line_positions(geometry) {
        Some(points) => line_string(&interpolate_line(&points, start, end)),
        None => with_constant(geometry, start),
    }
}

/// Altitude at each vertex follows its cumulative-distance fraction along the
/// line. A zero-length line falls back to the vertex index fraction.
pub fn interpolate_line(points: &[Position], start: f64, end: f64) -> Vec<Position> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![points[0].or_alt(start)];
    }
    let cumulative = cumulative_lengths_m(points);
    let total = cumulative[n - 1];
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let t = if i == n - 1 {
                1.0
            } else if total > 0.0 {
                cumulative[i] / total
            } else {
                i as f64 / (n - 1) as f64
            };
            p.or_alt(lerp(start, end, t))
        })
        .collect()
}

/// Exact at both ends: t = 0 gives `start`, t = 1 gives `end`.
#[inline]
fn lerp(start: f64, end: f64, t: f64) -> f64 {
    start * (1.0 - t) + end * t
}

/// Interpolates each `[from, to]` vertex range of `points` in place. Ranges
/// without both altitudes are left untouched.
pub fn interpolate_ranges(points: &mut [Position], ranges: &[(usize, usize, Option<f64>, Option<f64>)]) {
    for &(from, to, start, end) in ranges {
        let (Some(start), Some(end)) = (start, end) else { continue };
        if from >= to || to >= points.len() {
            continue;
        }
        let lifted = interpolate_line(&points[from..=to], start, end);
        points[from..=to].copy_from_slice(&lifted);
    }
}
