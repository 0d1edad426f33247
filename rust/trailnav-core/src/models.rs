use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::geometry::Position;

pub type NodeId = i64;
pub type EdgeId = i64;
pub type FeatureId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    pub fn validate(&self) -> NavResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(NavError::invalid(format!(
                "coordinate ({}, {}) is outside lon [-180,180] / lat [-90,90]",
                self.lon, self.lat
            )))
        }
    }
}

impl From<Position> for LonLat {
    fn from(p: Position) -> Self {
        LonLat::new(p.lon, p.lat)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub position: LonLat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl Node {
    pub fn new(id: NodeId, lon: f64, lat: f64) -> Self {
        Self { id, name: None, position: LonLat::new(lon, lat), altitude: None }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_altitude(mut self, meters: f64) -> Self {
        self.altitude = Some(meters);
        self
    }
}

pub const DEFAULT_EDGE_CATEGORY: &str = "walkway";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub cost: f64,
    /// `None` disables target→source traversal in directed searches.
    #[serde(default)]
    pub reverse_cost: Option<f64>,
    /// Empty means "straight segment between the endpoints"; filled in at snapshot build.
    #[serde(default)]
    pub geometry: Vec<Position>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_EDGE_CATEGORY.to_string()
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, cost: f64) -> Self {
        Self {
            id,
            source,
            target,
            cost,
            reverse_cost: Some(cost),
            geometry: Vec::new(),
            category: default_category(),
        }
    }

    pub fn one_way(mut self) -> Self {
        self.reverse_cost = None;
        self
    }

    pub fn with_reverse_cost(mut self, cost: Option<f64>) -> Self {
        self.reverse_cost = cost;
        self
    }

    pub fn with_geometry(mut self, geometry: Vec<Position>) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub node_id: NodeId,
    pub category: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Raw graph content as handed over by a loader, before integrity checks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    pub fn validate(&self) -> NavResult<()> {
        let lo = LonLat::new(self.min_lon, self.min_lat);
        let hi = LonLat::new(self.max_lon, self.max_lat);
        lo.validate()?;
        hi.validate()?;
        if self.min_lon > self.max_lon || self.min_lat > self.max_lat {
            return Err(NavError::invalid("bounding box minimum exceeds maximum"));
        }
        Ok(())
    }

    pub fn contains(&self, p: LonLat) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }

    pub fn corners(&self) -> ([f64; 2], [f64; 2]) {
        ([self.min_lon, self.min_lat], [self.max_lon, self.max_lat])
    }
}

impl std::str::FromStr for BoundingBox {
    type Err = NavError;

    /// Parses `minLon,minLat,maxLon,maxLat`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| NavError::invalid(format!("bbox '{}' is not four numbers", s)))?;
        match parts.as_slice() {
            [a, b, c, d] => {
                let bbox = BoundingBox::new(*a, *b, *c, *d);
                bbox.validate()?;
                Ok(bbox)
            }
            _ => Err(NavError::invalid(format!("bbox '{}' must have exactly four values", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lonlat_bounds() {
        assert!(LonLat::new(180.0, -90.0).is_valid());
        assert!(!LonLat::new(180.5, 0.0).is_valid());
        assert!(!LonLat::new(0.0, f64::NAN).is_valid());
        assert!(LonLat::new(0.0, 91.0).validate().is_err());
    }

    #[test]
    fn bbox_parses_and_validates() {
        let b: BoundingBox = "10.0, 45.0,10.5,45.25".parse().unwrap();
        assert_eq!(b, BoundingBox::new(10.0, 45.0, 10.5, 45.25));
        assert!(b.contains(LonLat::new(10.2, 45.1)));
        assert!(!b.contains(LonLat::new(10.6, 45.1)));
        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("3,2,1,4".parse::<BoundingBox>().is_err());
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn edge_defaults_to_two_way_walkway() {
        let e = Edge::new(1, 10, 11, 4.5);
        assert_eq!(e.reverse_cost, Some(4.5));
        assert_eq!(e.category, "walkway");
        assert_eq!(e.one_way().reverse_cost, None);
    }

    #[test]
    fn edge_deserializes_with_defaults() {
        let e: Edge = serde_json::from_str(r#"{"id":3,"source":1,"target":2,"cost":7.0}"#).unwrap();
        assert_eq!(e.reverse_cost, None);
        assert!(e.geometry.is_empty());
        assert_eq!(e.category, DEFAULT_EDGE_CATEGORY);
    }
}
