pub mod area;
pub mod db;
pub mod elevation;
pub mod engine;
pub mod error;
pub mod features;
pub mod geodesy;
pub mod geometry;
pub mod loader;
pub mod models;
pub mod navigator;
pub mod options;
pub mod resolver;
pub mod route;
pub mod snapshot;
pub mod spatial;

pub use area::{AreaGraph, AreaQuery};
pub use error::{NavError, NavResult};
pub use features::{FeatureFilter, FeatureHit, FeatureQuery, Page, Pagination};
pub use geojson::Geometry;
pub use geometry::Position;
pub use loader::{FeatureResolver, GraphLoader, InMemoryGraphLoader, SnapshotFeatureResolver};
pub use models::{BoundingBox, Edge, Feature, GraphData, LonLat, Node};
pub use navigator::{Destination, Navigator, RoutePlan, RouteRequest, SnapReport};
pub use options::{Profile, RoutingConfig};
pub use route::{RouteResult, RouteSegment};
pub use snapshot::{GraphSnapshot, SnapshotOptions, SnapshotStore};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
