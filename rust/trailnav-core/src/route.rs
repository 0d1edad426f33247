use serde::Serialize;

use crate::engine::PathResult;
use crate::error::{NavError, NavResult};
use crate::geodesy::polyline_length_m;
use geojson::Geometry;

use crate::geometry::{line_string, point, Position};
use crate::models::EdgeId;
use crate::snapshot::GraphSnapshot;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteSegment {
    pub edge_id: EdgeId,
    pub length_m: f64,
    pub cost: f64,
    pub category: String,
    /// Walked target→source.
    pub reversed: bool,
    /// Index of the segment's first vertex in the route geometry.
    pub vertex_offset: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteResult {
    pub distance_m: f64,
    pub duration_s: u64,
    pub cost: f64,
    pub geometry: Geometry,
    pub segments: Vec<RouteSegment>,
}

pub fn duration_s(distance_m: f64, speed_mps: f64) -> u64 {
    if speed_mps <= 0.0 || !distance_m.is_finite() {
        return 0;
    }
    (distance_m / speed_mps).round() as u64
}

pub struct RouteAssembler<'a> {
    snapshot: &'a GraphSnapshot,
    speed_mps: f64,
}

impl<'a> RouteAssembler<'a> {
    pub fn new(snapshot: &'a GraphSnapshot, speed_mps: f64) -> Self {
        Self { snapshot, speed_mps }
    }

    pub fn assemble(&self, path: &PathResult) -> NavResult<RouteResult> {
        if path.hops.is_empty() {
            if path.source != path.target {
                return Err(NavError::NoPath {
                    from: self.snapshot.node(path.source).id,
                    to: self.snapshot.node(path.target).id,
                });
            }
            let node = self.snapshot.node(path.source);
            let mut at = Position::from(node.position);
            at.alt = node.altitude;
            return Ok(RouteResult {
                distance_m: 0.0,
                duration_s: 0,
                cost: 0.0,
                geometry: point(at),
                segments: Vec::new(),
            });
        }

        let mut coords: Vec<Position> = Vec::new();
        let mut segments = Vec::with_capacity(path.hops.len());
        let mut distance_m = 0.0;
        for hop in &path.hops {
            let edge = self.snapshot.edge(hop.edge);
            let mut pts = edge.geometry.clone();
            if !hop.forward {
                pts.reverse();
            }
            let length_m = polyline_length_m(&pts);
            distance_m += length_m;
            let vertex_offset = coords.len().saturating_sub(1);
            // Consecutive hops share the junction vertex.
            let skip = usize::from(!coords.is_empty());
            coords.extend(pts.into_iter().skip(skip));
            segments.push(RouteSegment {
                edge_id: edge.id,
                length_m,
                cost: hop.cost,
                category: edge.category.clone(),
                reversed: !hop.forward,
                vertex_offset,
            });
        }

        Ok(RouteResult {
            distance_m,
            duration_s: duration_s(distance_m, self.speed_mps),
            cost: path.cost,
            geometry: line_string(&coords),
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{shortest_path, SearchParams};
    use crate::geodesy::equator_degrees;
    use crate::geometry::line_positions;
    use crate::models::{Edge, GraphData, Node};
    use crate::snapshot::SnapshotOptions;

    fn bent() -> GraphSnapshot {
        let d = equator_degrees(10.0);
        let nodes = vec![Node::new(1, 0.0, 0.0), Node::new(2, d, 0.0), Node::new(3, d, d)];
        let edges = vec![
            Edge::new(1, 1, 2, 10.0)
                .with_geometry(vec![Position::new(0.0, 0.0), Position::new(d / 2.0, 0.0), Position::new(d, 0.0)]),
            // Stored 3 -> 2 so the route walks it backwards.
            Edge::new(2, 3, 2, 10.0).with_category("ramp"),
        ];
        GraphSnapshot::build(GraphData { nodes, edges, features: vec![] }, 1, &SnapshotOptions::default()).unwrap()
    }

    #[test]
    fn merges_and_orients_geometry() {
        let s = bent();
        let path = shortest_path(&s, &SearchParams::new(0, 2)).unwrap();
        let r = RouteAssembler::new(&s, 1.0).assemble(&path).unwrap();
        let coords = line_positions(&r.geometry).expect("expected line");
        assert_eq!(coords.len(), 4);
        assert_eq!(coords[0], Position::new(0.0, 0.0));
        assert_eq!(coords[3], Position::from(s.node(2).position));
        assert_eq!(r.segments.len(), 2);
        assert!(r.segments[1].reversed);
        assert_eq!(r.segments[1].category, "ramp");
        assert_eq!(r.segments[1].vertex_offset, 2);
        let sum: f64 = r.segments.iter().map(|s| s.length_m).sum();
        assert!((r.distance_m - sum).abs() < 1e-9);
        assert!((r.distance_m - 20.0).abs() < 1e-3);
        assert_eq!(r.duration_s, 20);
        assert_eq!(r.cost, 20.0);
    }

    #[test]
    fn trivial_route_is_a_point() {
        let s = bent();
        let path = shortest_path(&s, &SearchParams::new(1, 1)).unwrap();
        let r = RouteAssembler::new(&s, 1.35).assemble(&path).unwrap();
        assert_eq!(r.distance_m, 0.0);
        assert_eq!(r.duration_s, 0);
        assert!(r.segments.is_empty());
        assert!(matches!(r.geometry.value, geojson::Value::Point(_)));
    }

    #[test]
    fn degenerate_path_is_no_path() {
        let s = bent();
        let p = PathResult { source: 0, target: 2, hops: vec![], cost: 0.0, settled: 0 };
        assert!(RouteAssembler::new(&s, 1.0).assemble(&p).unwrap_err().is_not_found());
    }

    #[test]
    fn duration_rounds_to_nearest_second() {
        assert_eq!(duration_s(135.0, 1.35), 100);
        assert_eq!(duration_s(10.0, 1.3), 8);
        assert_eq!(duration_s(0.0, 1.3), 0);
    }
}
