use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::geometry::Position;
use crate::models::{Edge, Feature, LonLat, Node};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: i64,
    pub name: Option<String>,
    pub lon: f64,
    pub lat: f64,
    pub altitude: Option<f64>,
}

impl From<NodeRow> for Node {
    fn from(r: NodeRow) -> Self {
        Node { id: r.id, name: r.name, position: LonLat::new(r.lon, r.lat), altitude: r.altitude }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRow {
    pub id: i64,
    pub source: i64,
    pub target: i64,
    pub cost: f64,
    pub reverse_cost: Option<f64>,
    pub category: String,
    /// JSON array of positions.
    pub geometry: Option<String>,
}

impl EdgeRow {
    pub fn into_edge(self) -> NavResult<Edge> {
        let geometry = match self.geometry.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(text) => serde_json::from_str::<Vec<Position>>(text)
                .map_err(|e| NavError::integrity(format!("edge {} geometry is not a coordinate array: {}", self.id, e)))?,
        };
        Ok(Edge {
            id: self.id,
            source: self.source,
            target: self.target,
            cost: self.cost,
            reverse_cost: self.reverse_cost,
            geometry,
            category: self.category,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub id: i64,
    pub node_id: i64,
    pub category: String,
    pub name: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
}

impl From<FeatureRow> for Feature {
    fn from(r: FeatureRow) -> Self {
        Feature {
            id: r.id,
            node_id: r.node_id,
            category: r.category,
            name: r.name,
            description: r.description,
            rating: r.rating,
        }
    }
}
