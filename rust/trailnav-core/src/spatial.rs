//! R-tree indexes over a snapshot's nodes and edge segments.
//!
//! Nearest-neighbour lookups run on earth-centred cartesian coordinates: chord
//! distance is monotonic in great-circle distance, so the R-tree's euclidean
//! nearest is also the geodesic nearest. Bounding-box lookups run on plain
//! lon/lat envelopes.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geodesy::{
    chord_for_arc_m, closest_on_chord, distance_sq, from_cartesian, haversine_m, normalize, to_cartesian,
};
use crate::models::{BoundingBox, Edge, LonLat, Node};

#[derive(Clone, Debug)]
struct PointEntry {
    xyz: [f64; 3],
    idx: u32,
}

impl RTreeObject for PointEntry {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xyz)
    }
}

impl PointDistance for PointEntry {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        distance_sq(self.xyz, *point)
    }
}

#[derive(Clone, Debug)]
struct SegmentEntry {
    a: [f64; 3],
    b: [f64; 3],
    edge: u32,
    segment: u32,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

impl PointDistance for SegmentEntry {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let (c, _) = closest_on_chord(*point, self.a, self.b);
        distance_sq(c, *point)
    }
}

/// A lon/lat segment (or a degenerate point) for bounding-box queries.
#[derive(Clone, Debug)]
struct PlanarEntry {
    a: [f64; 2],
    b: [f64; 2],
    idx: u32,
}

impl RTreeObject for PlanarEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeHit {
    pub node: u32,
    pub distance_m: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeHit {
    pub edge: u32,
    /// Index of the geometry leg within the edge.
    pub segment: u32,
    /// Fraction along that leg, 0 at its first vertex.
    pub fraction: f64,
    pub point: LonLat,
    pub distance_m: f64,
}

pub struct SpatialIndex {
    nodes: RTree<PointEntry>,
    entry_nodes: RTree<PointEntry>,
    segments: RTree<SegmentEntry>,
    node_planar: RTree<PlanarEntry>,
    segment_planar: RTree<PlanarEntry>,
    node_positions: Vec<LonLat>,
}

impl SpatialIndex {
    /// `edges` must already carry their full geometry.
    pub fn build(nodes: &[Node], edges: &[Edge], entry_nodes: &[u32]) -> Self {
        let node_points: Vec<PointEntry> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| PointEntry { xyz: to_cartesian(n.position), idx: i as u32 })
            .collect();
        let entry_points: Vec<PointEntry> =
            entry_nodes.iter().map(|&i| node_points[i as usize].clone()).collect();
        let node_planar = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let p = [n.position.lon, n.position.lat];
                PlanarEntry { a: p, b: p, idx: i as u32 }
            })
            .collect();

        let mut segments = Vec::new();
        let mut segment_planar = Vec::new();
        for (ei, e) in edges.iter().enumerate() {
            for (si, w) in e.geometry.windows(2).enumerate() {
                segments.push(SegmentEntry {
                    a: to_cartesian(w[0].lonlat()),
                    b: to_cartesian(w[1].lonlat()),
                    edge: ei as u32,
                    segment: si as u32,
                });
                segment_planar.push(PlanarEntry {
                    a: [w[0].lon, w[0].lat],
                    b: [w[1].lon, w[1].lat],
                    idx: ei as u32,
                });
            }
        }

        Self {
            nodes: RTree::bulk_load(node_points),
            entry_nodes: RTree::bulk_load(entry_points),
            segments: RTree::bulk_load(segments),
            node_planar: RTree::bulk_load(node_planar),
            segment_planar: RTree::bulk_load(segment_planar),
            node_positions: nodes.iter().map(|n| n.position).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node_positions.is_empty()
    }

    pub fn nearest_node(&self, at: LonLat) -> Option<NodeHit> {
        self.nearest_in(&self.nodes, at)
    }

    /// Nearest among nodes flagged as entry points.
    pub fn nearest_entry_node(&self, at: LonLat) -> Option<NodeHit> {
        self.nearest_in(&self.entry_nodes, at)
    }

    fn nearest_in(&self, tree: &RTree<PointEntry>, at: LonLat) -> Option<NodeHit> {
        let at = normalize(at);
        let hit = tree.nearest_neighbor(&to_cartesian(at))?;
        Some(NodeHit {
            node: hit.idx,
            distance_m: haversine_m(at, self.node_positions[hit.idx as usize]),
        })
    }

    /// Nodes within `radius_m` of `at`, closest first (ties by index).
    pub fn nodes_within(&self, at: LonLat, radius_m: f64) -> Vec<NodeHit> {
        let at = normalize(at);
        let chord = chord_for_arc_m(radius_m);
        let mut hits: Vec<NodeHit> = self
            .nodes
            .locate_within_distance(to_cartesian(at), chord * chord * (1.0 + 1e-9))
            .map(|e| NodeHit { node: e.idx, distance_m: haversine_m(at, self.node_positions[e.idx as usize]) })
            .filter(|h| h.distance_m <= radius_m)
            .collect();
        hits.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m).then(a.node.cmp(&b.node)));
        hits
    }

    /// Closest point on any edge geometry.
    pub fn nearest_edge(&self, at: LonLat) -> Option<EdgeHit> {
        let at = normalize(at);
        let q = to_cartesian(at);
        let seg = self.segments.nearest_neighbor(&q)?;
        let (c, fraction) = closest_on_chord(q, seg.a, seg.b);
        let point = from_cartesian(c);
        Some(EdgeHit {
            edge: seg.edge,
            segment: seg.segment,
            fraction,
            point,
            distance_m: haversine_m(at, point),
        })
    }

    /// Node indices inside `bbox`, ascending.
    pub fn nodes_in_bbox(&self, bbox: &BoundingBox) -> Vec<u32> {
        let (lo, hi) = bbox.corners();
        let mut out: Vec<u32> = self
            .node_planar
            .locate_in_envelope_intersecting(&AABB::from_corners(lo, hi))
            .map(|e| e.idx)
            .collect();
        out.sort_unstable();
        out
    }

    /// Edge indices with at least one geometry leg crossing `bbox`, ascending.
    pub fn edges_in_bbox(&self, bbox: &BoundingBox) -> Vec<u32> {
        let (lo, hi) = bbox.corners();
        let mut out: Vec<u32> = self
            .segment_planar
            .locate_in_envelope_intersecting(&AABB::from_corners(lo, hi))
            .filter(|e| segment_hits_box(e.a, e.b, bbox))
            .map(|e| e.idx)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Liang-Barsky clip of segment `a`-`b` against the box.
fn segment_hits_box(a: [f64; 2], b: [f64; 2], bbox: &BoundingBox) -> bool {
    let d = [b[0] - a[0], b[1] - a[1]];
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let checks = [
        (-d[0], a[0] - bbox.min_lon),
        (d[0], bbox.max_lon - a[0]),
        (-d[1], a[1] - bbox.min_lat),
        (d[1], bbox.max_lat - a[1]),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;

    fn grid() -> (Vec<Node>, Vec<Edge>) {
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.001, 0.0),
            Node::new(3, 0.001, 0.001),
            Node::new(4, 0.0, 0.001),
        ];
        let line = |a: &Node, b: &Node| vec![Position::from(a.position), Position::from(b.position)];
        let edges = vec![
            Edge::new(10, 1, 2, 1.0).with_geometry(line(&nodes[0], &nodes[1])),
            Edge::new(11, 2, 3, 1.0).with_geometry(line(&nodes[1], &nodes[2])),
            Edge::new(12, 3, 4, 1.0).with_geometry(line(&nodes[2], &nodes[3])),
        ];
        (nodes, edges)
    }

    #[test]
    fn empty_index_answers_none() {
        let idx = SpatialIndex::build(&[], &[], &[]);
        assert!(idx.is_empty());
        assert!(idx.nearest_node(LonLat::new(0.0, 0.0)).is_none());
        assert!(idx.nearest_edge(LonLat::new(0.0, 0.0)).is_none());
        assert!(idx.nearest_entry_node(LonLat::new(0.0, 0.0)).is_none());
        assert!(idx.nodes_within(LonLat::new(0.0, 0.0), 100.0).is_empty());
    }

    #[test]
    fn nearest_node_reports_geodesic_distance() {
        let (nodes, edges) = grid();
        let idx = SpatialIndex::build(&nodes, &edges, &[]);
        let q = LonLat::new(0.0009, 0.0001);
        let hit = idx.nearest_node(q).unwrap();
        assert_eq!(hit.node, 1);
        assert!((hit.distance_m - haversine_m(q, nodes[1].position)).abs() < 1e-9);
    }

    #[test]
    fn entry_tree_only_sees_entry_nodes() {
        let (nodes, edges) = grid();
        let idx = SpatialIndex::build(&nodes, &edges, &[2]);
        assert_eq!(idx.nearest_entry_node(LonLat::new(0.0, 0.0)).unwrap().node, 2);
    }

    #[test]
    fn nearest_edge_projects_onto_segment() {
        let (nodes, edges) = grid();
        let idx = SpatialIndex::build(&nodes, &edges, &[]);
        let hit = idx.nearest_edge(LonLat::new(0.0005, -0.0002)).unwrap();
        assert_eq!(hit.edge, 0);
        assert!((hit.point.lon - 0.0005).abs() < 1e-7);
        assert!(hit.point.lat.abs() < 1e-7);
        assert!((hit.fraction - 0.5).abs() < 1e-3);
        assert!((hit.distance_m - 22.24).abs() < 0.05);
    }

    #[test]
    fn radius_query_is_inclusive_and_sorted() {
        let (nodes, edges) = grid();
        let idx = SpatialIndex::build(&nodes, &edges, &[]);
        let exact = haversine_m(LonLat::new(0.0, 0.0), nodes[1].position);
        let hits = idx.nodes_within(LonLat::new(0.0, 0.0), exact);
        let ids: Vec<u32> = hits.iter().map(|h| h.node).collect();
        assert_eq!(ids[0], 0);
        assert!(ids.contains(&1));
        assert!(!ids.contains(&2));
    }

    #[test]
    fn bbox_queries_refine_segments() {
        let (nodes, edges) = grid();
        let idx = SpatialIndex::build(&nodes, &edges, &[]);
        let b = BoundingBox::new(0.0004, -0.0001, 0.0006, 0.0001);
        assert!(idx.nodes_in_bbox(&b).is_empty());
        assert_eq!(idx.edges_in_bbox(&b), vec![0]);
        let all = BoundingBox::new(-1.0, -1.0, 1.0, 1.0);
        assert_eq!(idx.nodes_in_bbox(&all), vec![0, 1, 2, 3]);
        assert_eq!(idx.edges_in_bbox(&all), vec![0, 1, 2]);
    }

    #[test]
    fn liang_barsky_rejects_diagonal_miss() {
        let b = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(!segment_hits_box([1.5, 0.0], [2.5, 1.0], &b));
        assert!(segment_hits_box([-1.0, 0.5], [2.0, 0.5], &b));
        assert!(!segment_hits_box([-1.0, 1.5], [1.5, 3.0], &b));
    }
}
