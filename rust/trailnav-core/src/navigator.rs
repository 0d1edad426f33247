//! Request-level entry points used by transports.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use geojson::Geometry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::area::{graph_in_area, AreaGraph, AreaQuery};
use crate::elevation::{interpolate_ranges, with_constant, with_range, ElevationSpec};
use crate::engine::{k_shortest_paths, PathResult, MAX_ALTERNATIVES};
use crate::error::{NavError, NavResult};
use crate::features::{search_features, FeatureHit, FeatureQuery, Page};
use crate::geometry::{line_positions, line_string};
use crate::loader::FeatureResolver;
use crate::models::{FeatureId, LonLat, NodeId};
use crate::options::{Profile, RoutingConfig};
use crate::resolver::{EphemeralStart, StartPointResolver};
use crate::route::{RouteAssembler, RouteResult};
use crate::snapshot::{GraphSnapshot, SnapshotStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Node(NodeId),
    Feature(FeatureId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub from: LonLat,
    pub to: Destination,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub alternatives: u32,
    #[serde(default)]
    pub elevation: Option<ElevationSpec>,
}

impl RouteRequest {
    pub fn new(from: LonLat, to: Destination) -> Self {
        Self { from, to, profile: None, directed: false, alternatives: 0, elevation: None }
    }

    /// Checks everything that does not need the graph.
    pub fn validate(&self) -> NavResult<Profile> {
        self.from.validate()?;
        let profile = match self.profile.as_deref() {
            Some(p) => p.parse::<Profile>()?,
            None => Profile::Default,
        };
        if self.alternatives > MAX_ALTERNATIVES {
            return Err(NavError::invalid(format!("alternatives must be between 0 and {}", MAX_ALTERNATIVES)));
        }
        if let Some(e) = &self.elevation {
            e.validate()?;
        }
        Ok(profile)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoutePlan {
    pub start: EphemeralStart,
    pub destination_node: NodeId,
    pub profile: Profile,
    #[serde(flatten)]
    pub route: RouteResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<RouteResult>,
    pub snapshot_version: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SnapReport {
    pub query: LonLat,
    pub node_id: Option<NodeId>,
    pub node_distance_m: Option<f64>,
    pub edge_id: Option<i64>,
    pub edge_point: Option<LonLat>,
    pub edge_distance_m: Option<f64>,
    pub snapshot_version: u64,
}

pub struct Navigator {
    store: Arc<SnapshotStore>,
    features: Arc<dyn FeatureResolver>,
    config: RoutingConfig,
}

impl Navigator {
    pub fn new(store: Arc<SnapshotStore>, features: Arc<dyn FeatureResolver>, config: RoutingConfig) -> Self {
        Self { store, features, config }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Resolves the start, finds the path(s), and assembles the route. The
    /// snapshot is pinned for the whole call.
    pub fn resolve_route(&self, req: &RouteRequest, cancel: Option<&AtomicBool>) -> NavResult<RoutePlan> {
        let profile = req.validate()?;
        let snapshot = self.store.current()?;
        let span = info_span!("route", snapshot_version = snapshot.version(), profile = ?profile);
        let _enter = span.enter();

        let target = self.destination_node(&snapshot, req.to)?;
        let start = StartPointResolver::new(&snapshot, self.config.entry_distance_m).resolve(req.from)?;
        let paths = k_shortest_paths(&snapshot, start.node, target, req.directed, req.alternatives, cancel)?;

        let assembler = RouteAssembler::new(&snapshot, self.config.speeds.speed(profile));
        let mut routes = Vec::with_capacity(paths.len());
        for path in &paths {
            let mut route = assembler.assemble(path)?;
            if let Some(spec) = req.elevation {
                route.geometry = project(&snapshot, &route, path, spec);
            }
            routes.push(route);
        }
        let mut routes = routes.into_iter();
        let route = routes.next().ok_or_else(|| NavError::NoPath { from: start.node_id, to: snapshot.node(target).id })?;
        debug!(
            mode = start.mode.as_str(),
            distance_m = route.distance_m,
            cost = route.cost,
            expanded = paths[0].settled,
            alternatives = paths.len() - 1,
            "route resolved"
        );
        Ok(RoutePlan {
            destination_node: snapshot.node(target).id,
            start,
            profile,
            route,
            alternatives: routes.collect(),
            snapshot_version: snapshot.version(),
        })
    }

    fn destination_node(&self, snapshot: &GraphSnapshot, to: Destination) -> NavResult<u32> {
        let node_id = match to {
            Destination::Node(id) => id,
            Destination::Feature(fid) => self.features.node_id_for(fid)?,
        };
        snapshot.node_idx(node_id).ok_or_else(|| NavError::not_found(format!("node {}", node_id)))
    }

    pub fn query_nearest_features(&self, query: &FeatureQuery) -> NavResult<Page<FeatureHit>> {
        let snapshot = self.store.current()?;
        search_features(&snapshot, query, self.config.max_page_size)
    }

    pub fn query_graph_in_area(&self, query: &AreaQuery) -> NavResult<AreaGraph> {
        let snapshot = self.store.current()?;
        graph_in_area(&snapshot, query)
    }

    /// Nearest node and nearest edge point, for debugging snapping.
    pub fn snap(&self, at: LonLat) -> NavResult<SnapReport> {
        at.validate()?;
        let snapshot = self.store.current()?;
        let node = snapshot.spatial().nearest_node(at);
        let edge = snapshot.spatial().nearest_edge(at);
        Ok(SnapReport {
            query: at,
            node_id: node.map(|h| snapshot.node(h.node).id),
            node_distance_m: node.map(|h| h.distance_m),
            edge_id: edge.map(|h| snapshot.edge(h.edge).id),
            edge_point: edge.map(|h| h.point),
            edge_distance_m: edge.map(|h| h.distance_m),
            snapshot_version: snapshot.version(),
        })
    }
}

fn project(snapshot: &GraphSnapshot, route: &RouteResult, path: &PathResult, spec: ElevationSpec) -> Geometry {
    match spec {
        ElevationSpec::Constant { meters } => with_constant(&route.geometry, meters),
        ElevationSpec::Range { start, end } => with_range(&route.geometry, start, end),
        ElevationSpec::Nodes => match line_positions(&route.geometry) {
            Some(mut coords) => {
                let last = coords.len().saturating_sub(1);
                let ranges: Vec<_> = route
                    .segments
                    .iter()
                    .zip(&path.hops)
                    .enumerate()
                    .map(|(i, (seg, hop))| {
                        let end = route.segments.get(i + 1).map_or(last, |next| next.vertex_offset);
                        (seg.vertex_offset, end, snapshot.node(hop.from).altitude, snapshot.node(hop.to).altitude)
                    })
                    .collect();
                interpolate_ranges(&mut coords, &ranges);
                line_string(&coords)
            }
            None => route.geometry.clone(),
        },
    }
}
