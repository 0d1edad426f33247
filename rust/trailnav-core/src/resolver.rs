use serde::Serialize;
use tracing::debug;

use crate::error::{NavError, NavResult};
use crate::models::{LonLat, NodeId};
use crate::snapshot::GraphSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    Direct,
    EntryFallback,
    NearestUnconstrained,
}

impl ResolutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMode::Direct => "direct",
            ResolutionMode::EntryFallback => "entry-fallback",
            ResolutionMode::NearestUnconstrained => "nearest-unconstrained",
        }
    }
}

/// Request-scoped stand-in for the query coordinate. Never stored in a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EphemeralStart {
    pub origin: LonLat,
    pub node_id: NodeId,
    #[serde(skip)]
    pub node: u32,
    pub mode: ResolutionMode,
    /// Distance from `origin` to the chosen node.
    pub snap_distance_m: f64,
}

pub struct StartPointResolver<'a> {
    snapshot: &'a GraphSnapshot,
    entry_distance_m: f64,
}

impl<'a> StartPointResolver<'a> {
    pub fn new(snapshot: &'a GraphSnapshot, entry_distance_m: f64) -> Self {
        Self { snapshot, entry_distance_m }
    }

    pub fn resolve(&self, origin: LonLat) -> NavResult<EphemeralStart> {
        origin.validate()?;
        let spatial = self.snapshot.spatial();
        let nearest = spatial
            .nearest_node(origin)
            .ok_or_else(|| NavError::not_found("graph has no nodes to start from"))?;

        let (hit, mode) = if nearest.distance_m <= self.entry_distance_m {
            (nearest, ResolutionMode::Direct)
        } else if let Some(entry) = spatial.nearest_entry_node(origin) {
            (entry, ResolutionMode::EntryFallback)
        } else {
            (nearest, ResolutionMode::NearestUnconstrained)
        };

        let node_id = self.snapshot.node(hit.node).id;
        debug!(node_id, mode = mode.as_str(), distance_m = hit.distance_m, "start point resolved");
        Ok(EphemeralStart { origin, node_id, node: hit.node, mode, snap_distance_m: hit.distance_m })
    }
}
