//! Immutable, validated graph snapshot with its derived indexes.

mod store;

pub use store::SnapshotStore;

use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::engine::adjacency::{Adjacency, Arc};
use crate::error::{NavError, NavResult};
use crate::geodesy::{haversine_m, polyline_length_m};
use crate::geometry::Position;
use crate::models::{Edge, EdgeId, Feature, FeatureId, GraphData, Node, NodeId};
use crate::spatial::SpatialIndex;

/// Maximum gap between an edge geometry's end vertex and its node.
pub const ENDPOINT_TOLERANCE_M: f64 = 1.0;
pub const DEFAULT_ENTRY_PREFIX: &str = "ENTRY";

#[derive(Clone, Debug)]
pub struct SnapshotOptions {
    pub entry_prefix: String,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self { entry_prefix: DEFAULT_ENTRY_PREFIX.to_string() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SnapshotCounts {
    pub nodes: usize,
    pub edges: usize,
    pub features: usize,
    pub entry_nodes: usize,
}

pub struct GraphSnapshot {
    version: u64,
    loaded_at: u64,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    features: Vec<Feature>,
    node_index: FxHashMap<NodeId, u32>,
    edge_index: FxHashMap<EdgeId, u32>,
    feature_index: FxHashMap<FeatureId, u32>,
    edge_ends: Vec<(u32, u32)>,
    edge_length_m: Vec<f64>,
    features_by_node: FxHashMap<u32, Vec<u32>>,
    entry_nodes: Vec<u32>,
    directed: Adjacency,
    undirected: Adjacency,
    spatial: SpatialIndex,
}

fn valid_cost(c: f64) -> bool {
    c.is_finite() && c >= 0.0
}

pub fn is_entry_name(name: &str, prefix: &str) -> bool {
    name.trim_start()
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

impl GraphSnapshot {
    /// Validates `data` and derives adjacency and spatial indexes.
    ///
    /// Rejects duplicate ids, coordinates out of range, edges referencing missing
    /// nodes, invalid costs, and geometries whose ends stray from their nodes.
    /// Features attached to missing nodes are skipped.
    pub fn build(data: GraphData, version: u64, options: &SnapshotOptions) -> NavResult<Self> {
        let GraphData { nodes, mut edges, features } = data;

        let mut node_index = FxHashMap::default();
        node_index.reserve(nodes.len());
        for (i, n) in nodes.iter().enumerate() {
            if !n.position.is_valid() {
                return Err(NavError::integrity(format!(
                    "node {} has invalid coordinates ({}, {})",
                    n.id, n.position.lon, n.position.lat
                )));
            }
            if node_index.insert(n.id, i as u32).is_some() {
                return Err(NavError::integrity(format!("duplicate node id {}", n.id)));
            }
        }

        let mut edge_index = FxHashMap::default();
        let mut edge_ends = Vec::with_capacity(edges.len());
        let mut edge_length_m = Vec::with_capacity(edges.len());
        for (i, e) in edges.iter_mut().enumerate() {
            if edge_index.insert(e.id, i as u32).is_some() {
                return Err(NavError::integrity(format!("duplicate edge id {}", e.id)));
            }
            let s = *node_index.get(&e.source).ok_or_else(|| {
                NavError::integrity(format!("edge {} references missing source node {}", e.id, e.source))
            })?;
            let t = *node_index.get(&e.target).ok_or_else(|| {
                NavError::integrity(format!("edge {} references missing target node {}", e.id, e.target))
            })?;
            if !valid_cost(e.cost) {
                return Err(NavError::integrity(format!("edge {} has invalid cost {}", e.id, e.cost)));
            }
            if let Some(rc) = e.reverse_cost {
                if rc.is_nan() || rc.is_infinite() {
                    return Err(NavError::integrity(format!("edge {} has invalid reverse cost {}", e.id, rc)));
                }
                if rc < 0.0 {
                    e.reverse_cost = None;
                }
            }
            let (sp, tp) = (nodes[s as usize].position, nodes[t as usize].position);
            if e.geometry.is_empty() {
                e.geometry = vec![Position::from(sp), Position::from(tp)];
            } else {
                if e.geometry.len() < 2 {
                    return Err(NavError::integrity(format!("edge {} geometry has fewer than two vertices", e.id)));
                }
                if e.geometry.iter().any(|p| !p.lonlat().is_valid()) {
                    return Err(NavError::integrity(format!("edge {} geometry has invalid coordinates", e.id)));
                }
                let first = e.geometry[0].lonlat();
                let last = e.geometry[e.geometry.len() - 1].lonlat();
                let gap = haversine_m(first, sp).max(haversine_m(last, tp));
                if gap > ENDPOINT_TOLERANCE_M {
                    return Err(NavError::integrity(format!(
                        "edge {} geometry ends {:.2} m away from its nodes",
                        e.id, gap
                    )));
                }
            }
            edge_ends.push((s, t));
            edge_length_m.push(polyline_length_m(&e.geometry));
        }

        let mut kept = Vec::with_capacity(features.len());
        let mut feature_index = FxHashMap::default();
        let mut features_by_node: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        for f in features {
            let Some(&node) = node_index.get(&f.node_id) else {
                warn!(feature_id = f.id, node_id = f.node_id, "feature references missing node; skipped");
                continue;
            };
            let idx = kept.len() as u32;
            if feature_index.insert(f.id, idx).is_some() {
                return Err(NavError::integrity(format!("duplicate feature id {}", f.id)));
            }
            features_by_node.entry(node).or_default().push(idx);
            kept.push(f);
        }

        let entry_nodes: Vec<u32> = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.name.as_deref().is_some_and(|name| is_entry_name(name, &options.entry_prefix)))
            .map(|(i, _)| i as u32)
            .collect();

        let (directed, undirected) = build_adjacency(nodes.len(), &edges, &edge_ends);
        let spatial = SpatialIndex::build(&nodes, &edges, &entry_nodes);
        let loaded_at = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

        debug!(
            version,
            nodes = nodes.len(),
            edges = edges.len(),
            features = kept.len(),
            entry_nodes = entry_nodes.len(),
            "graph snapshot built"
        );

        Ok(Self {
            version,
            loaded_at,
            nodes,
            edges,
            features: kept,
            node_index,
            edge_index,
            feature_index,
            edge_ends,
            edge_length_m,
            features_by_node,
            entry_nodes,
            directed,
            undirected,
            spatial,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Unix seconds at build time.
    pub fn loaded_at(&self) -> u64 {
        self.loaded_at
    }

    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            features: self.features.len(),
            entry_nodes: self.entry_nodes.len(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn node(&self, idx: u32) -> &Node {
        &self.nodes[idx as usize]
    }

    pub fn edge(&self, idx: u32) -> &Edge {
        &self.edges[idx as usize]
    }

    pub fn feature(&self, idx: u32) -> &Feature {
        &self.features[idx as usize]
    }

    pub fn node_idx(&self, id: NodeId) -> Option<u32> {
        self.node_index.get(&id).copied()
    }

    pub fn edge_idx(&self, id: EdgeId) -> Option<u32> {
        self.edge_index.get(&id).copied()
    }

    pub fn feature_idx(&self, id: FeatureId) -> Option<u32> {
        self.feature_index.get(&id).copied()
    }

    /// (source, target) node indices.
    pub fn edge_ends(&self, idx: u32) -> (u32, u32) {
        self.edge_ends[idx as usize]
    }

    pub fn edge_length_m(&self, idx: u32) -> f64 {
        self.edge_length_m[idx as usize]
    }

    pub fn features_at(&self, node: u32) -> &[u32] {
        self.features_by_node.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry_nodes(&self) -> &[u32] {
        &self.entry_nodes
    }

    pub fn adjacency(&self, directed: bool) -> &Adjacency {
        if directed {
            &self.directed
        } else {
            &self.undirected
        }
    }

    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }
}

/// Directed arcs honour `reverse_cost`; undirected arcs cost the cheaper enabled
/// direction both ways.
fn build_adjacency(nodes: usize, edges: &[Edge], ends: &[(u32, u32)]) -> (Adjacency, Adjacency) {
    let mut directed = Vec::with_capacity(edges.len() * 2);
    let mut undirected = Vec::with_capacity(edges.len() * 2);
    for (i, e) in edges.iter().enumerate() {
        let (s, t) = ends[i];
        let edge = i as u32;
        directed.push(Arc { src: s, dst: t, edge, w: e.cost, forward: true });
        if let Some(rc) = e.reverse_cost {
            directed.push(Arc { src: t, dst: s, edge, w: rc, forward: false });
        }
        let w = e.reverse_cost.map_or(e.cost, |rc| rc.min(e.cost));
        undirected.push(Arc { src: s, dst: t, edge, w, forward: true });
        if s != t {
            undirected.push(Arc { src: t, dst: s, edge, w, forward: false });
        }
    }
    (Adjacency::build(nodes, &directed), Adjacency::build(nodes, &undirected))
}
