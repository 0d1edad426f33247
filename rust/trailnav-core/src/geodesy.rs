//! Great-circle helpers on a spherical earth.

use crate::geometry::Position;
use crate::models::LonLat;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn haversine_m(a: LonLat, b: LonLat) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn polyline_length_m(points: &[Position]) -> f64 {
    points.windows(2).map(|w| haversine_m(w[0].lonlat(), w[1].lonlat())).sum()
}

/// Cumulative distance at each vertex, starting with 0.
pub fn cumulative_lengths_m(points: &[Position]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += haversine_m(points[i - 1].lonlat(), p.lonlat());
        }
        out.push(acc);
    }
    out
}

/// Clamps latitude and wraps longitude into [-180, 180].
pub fn normalize(p: LonLat) -> LonLat {
    let lat = if p.lat.is_finite() { p.lat.clamp(-90.0, 90.0) } else { 0.0 };
    let lon = if !p.lon.is_finite() {
        0.0
    } else if (-180.0..=180.0).contains(&p.lon) {
        p.lon
    } else {
        (p.lon + 180.0).rem_euclid(360.0) - 180.0
    };
    LonLat::new(lon, lat)
}

/// Earth-centred cartesian coordinates in metres. Straight-line (chord) distance
/// between two such points grows monotonically with their great-circle distance.
pub fn to_cartesian(p: LonLat) -> [f64; 3] {
    let (lon, lat) = (p.lon.to_radians(), p.lat.to_radians());
    [
        EARTH_RADIUS_M * lat.cos() * lon.cos(),
        EARTH_RADIUS_M * lat.cos() * lon.sin(),
        EARTH_RADIUS_M * lat.sin(),
    ]
}

/// Projects a cartesian point (not necessarily on the sphere) back to lon/lat.
pub fn from_cartesian(v: [f64; 3]) -> LonLat {
    let [x, y, z] = v;
    let lat = z.atan2((x * x + y * y).sqrt()).to_degrees();
    let lon = y.atan2(x).to_degrees();
    LonLat::new(lon, lat)
}

/// Chord length subtending an arc of `meters` along the surface.
pub fn chord_for_arc_m(meters: f64) -> f64 {
    let angle = (meters.max(0.0) / EARTH_RADIUS_M).min(std::f64::consts::PI);
    2.0 * EARTH_RADIUS_M * (angle / 2.0).sin()
}

pub fn distance_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    d[0] * d[0] + d[1] * d[1] + d[2] * d[2]
}

/// Closest point to `p` on the chord `a`-`b`, with its fraction along the chord.
pub fn closest_on_chord(p: [f64; 3], a: [f64; 3], b: [f64; 3]) -> ([f64; 3], f64) {
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ap = [p[0] - a[0], p[1] - a[1], p[2] - a[2]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1] + ab[2] * ab[2];
    if len_sq == 0.0 {
        return (a, 0.0);
    }
    let t = ((ap[0] * ab[0] + ap[1] * ab[1] + ap[2] * ab[2]) / len_sq).clamp(0.0, 1.0);
    ([a[0] + t * ab[0], a[1] + t * ab[1], a[2] + t * ab[2]], t)
}

/// Degrees of longitude spanning `meters` along the equator.
pub fn equator_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_matches_equator_arc() {
        let a = LonLat::new(0.0, 0.0);
        let b = LonLat::new(equator_degrees(1234.5), 0.0);
        assert!((haversine_m(a, b) - 1234.5).abs() < 1e-6);
        assert_eq!(haversine_m(a, a), 0.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = LonLat::new(12.49, 41.89);
        let b = LonLat::new(2.35, 48.86);
        assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-9);
        // Rome to Paris is roughly 1100 km.
        assert!((haversine_m(a, b) / 1000.0 - 1106.0).abs() < 10.0);
    }

    #[test]
    fn polyline_sums_legs() {
        let d = equator_degrees(10.0);
        let pts = [Position::new(0.0, 0.0), Position::new(d, 0.0), Position::new(2.0 * d, 0.0)];
        assert!((polyline_length_m(&pts) - 20.0).abs() < 1e-6);
        let cum = cumulative_lengths_m(&pts);
        assert_eq!(cum.len(), 3);
        assert!((cum[1] - 10.0).abs() < 1e-6);
        assert_eq!(polyline_length_m(&pts[..1]), 0.0);
    }

    #[test]
    fn cartesian_round_trips() {
        let p = LonLat::new(-73.98, 40.75);
        let back = from_cartesian(to_cartesian(p));
        assert!((back.lon - p.lon).abs() < 1e-9);
        assert!((back.lat - p.lat).abs() < 1e-9);
    }

    #[test]
    fn chord_is_monotonic_with_arc() {
        let a = LonLat::new(0.0, 0.0);
        let b = LonLat::new(0.3, 0.2);
        let chord = distance_sq(to_cartesian(a), to_cartesian(b)).sqrt();
        assert!((chord - chord_for_arc_m(haversine_m(a, b))).abs() < 1e-6);
        assert!(chord_for_arc_m(100.0) < chord_for_arc_m(101.0));
    }

    #[test]
    fn normalize_wraps_and_clamps() {
        let n = normalize(LonLat::new(190.0, 95.0));
        assert!((n.lon + 170.0).abs() < 1e-9);
        assert_eq!(n.lat, 90.0);
        assert_eq!(normalize(LonLat::new(180.0, -10.0)), LonLat::new(180.0, -10.0));
    }

    #[test]
    fn closest_on_chord_clamps() {
        let (c, t) = closest_on_chord([5.0, 5.0, 0.0], [0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);
        assert_eq!(c, [5.0, 0.0, 0.0]);
        assert_eq!(t, 0.5);
        let (_, t) = closest_on_chord([-3.0, 1.0, 0.0], [0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);
        assert_eq!(t, 0.0);
    }
}
