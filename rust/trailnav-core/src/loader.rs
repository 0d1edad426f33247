//! Seams through which graph content and feature lookups reach the engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{NavError, NavResult};
use crate::models::{FeatureId, GraphData, NodeId};
use crate::snapshot::{GraphSnapshot, SnapshotOptions, SnapshotStore};

/// Produces a fresh, validated snapshot on every call.
pub trait GraphLoader: Send + Sync {
    fn current_snapshot(&self) -> NavResult<GraphSnapshot>;

    fn describe(&self) -> String {
        "graph loader".to_string()
    }
}

/// Maps a feature to the node it is attached to.
pub trait FeatureResolver: Send + Sync {
    fn node_id_for(&self, feature: FeatureId) -> NavResult<NodeId>;
}

/// Serves graph content held in memory. `replace` swaps the content picked up by
/// the next `current_snapshot`.
pub struct InMemoryGraphLoader {
    data: RwLock<GraphData>,
    options: SnapshotOptions,
    version: AtomicU64,
}

impl InMemoryGraphLoader {
    pub fn new(data: GraphData, options: SnapshotOptions) -> Self {
        Self { data: RwLock::new(data), options, version: AtomicU64::new(0) }
    }

    pub fn replace(&self, data: GraphData) {
        match self.data.write() {
            Ok(mut guard) => *guard = data,
            Err(poisoned) => *poisoned.into_inner() = data,
        }
    }
}

impl GraphLoader for InMemoryGraphLoader {
    fn current_snapshot(&self) -> NavResult<GraphSnapshot> {
        let data = match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        GraphSnapshot::build(data, version, &self.options)
    }

    fn describe(&self) -> String {
        "in-memory graph".to_string()
    }
}

/// Resolves features against whatever snapshot is currently published.
pub struct SnapshotFeatureResolver {
    store: Arc<SnapshotStore>,
}

impl SnapshotFeatureResolver {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }
}

impl FeatureResolver for SnapshotFeatureResolver {
    fn node_id_for(&self, feature: FeatureId) -> NavResult<NodeId> {
        let snapshot = self.store.current()?;
        snapshot
            .feature_idx(feature)
            .map(|i| snapshot.feature(i).node_id)
            .ok_or_else(|| NavError::not_found(format!("feature {}", feature)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, Node};

    #[test]
    fn in_memory_loader_bumps_version() {
        let loader = InMemoryGraphLoader::new(GraphData::default(), SnapshotOptions::default());
        assert_eq!(loader.current_snapshot().unwrap().version(), 1);
        assert_eq!(loader.current_snapshot().unwrap().version(), 2);
    }

    #[test]
    fn snapshot_resolver_finds_feature_node() {
        let data = GraphData {
            nodes: vec![Node::new(5, 0.0, 0.0)],
            edges: vec![],
            features: vec![Feature {
                id: 9,
                node_id: 5,
                category: "wc".into(),
                name: "Restroom".into(),
                description: None,
                rating: None,
            }],
        };
        let store = Arc::new(SnapshotStore::new());
        let resolver = SnapshotFeatureResolver::new(store.clone());
        assert!(matches!(resolver.node_id_for(9), Err(NavError::GraphUnavailable)));
        store.refresh(&InMemoryGraphLoader::new(data, SnapshotOptions::default())).unwrap();
        assert_eq!(resolver.node_id_for(9).unwrap(), 5);
        assert!(resolver.node_id_for(10).unwrap_err().is_not_found());
    }
}
