use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::db::queries::*;
use crate::db::rows::*;
use crate::error::{NavError, NavResult};
use crate::loader::{FeatureResolver, GraphLoader};
use crate::models::{Edge, Feature, FeatureId, GraphData, Node, NodeId};
use crate::snapshot::{GraphSnapshot, SnapshotOptions, SnapshotStore};

pub mod open;
pub mod queries;
pub mod rows;

pub use open::{open_read_only_with_config, DbOpenConfig, TempStore};

pub struct Database {
    conn: Connection,
}

fn is_no_such_table(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.contains("no such table"),
        _ => false,
    }
}

fn map_node_row(r: &Row) -> rusqlite::Result<NodeRow> {
    Ok(NodeRow {
        id: r.get("id")?,
        name: r.get("name")?,
        lon: r.get("lon")?,
        lat: r.get("lat")?,
        altitude: r.get("altitude")?,
    })
}

fn map_edge_row(r: &Row) -> rusqlite::Result<EdgeRow> {
    Ok(EdgeRow {
        id: r.get("id")?,
        source: r.get("source")?,
        target: r.get("target")?,
        cost: r.get("cost")?,
        reverse_cost: r.get("reverse_cost")?,
        category: r.get("category")?,
        geometry: r.get("geometry")?,
    })
}

fn map_feature_row(r: &Row) -> rusqlite::Result<FeatureRow> {
    Ok(FeatureRow {
        id: r.get("id")?,
        node_id: r.get("node_id")?,
        category: r.get("category")?,
        name: r.get("name")?,
        description: r.get("description")?,
        rating: r.get("rating")?,
    })
}

impl Database {
    pub fn open_read_only<P: AsRef<Path>>(path: P, cfg: &DbOpenConfig) -> rusqlite::Result<Self> {
        let conn = open_read_only_with_config(path, cfg)?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn iter_nodes(&self) -> rusqlite::Result<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(ALL_NODES)?;
        let nodes = stmt.query_map([], map_node_row)?.map(|r| r.map(Node::from)).collect();
        nodes
    }

    pub fn iter_edges(&self) -> NavResult<Vec<Edge>> {
        let mut stmt = self.conn.prepare_cached(ALL_EDGES)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            out.push(map_edge_row(r)?.into_edge()?);
        }
        Ok(out)
    }

    /// A database without a features table simply has no features.
    pub fn iter_features(&self) -> rusqlite::Result<Vec<Feature>> {
        let mut stmt = match self.conn.prepare_cached(ALL_FEATURES) {
            Ok(s) => s,
            Err(e) if is_no_such_table(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let features = stmt.query_map([], map_feature_row)?.map(|r| r.map(Feature::from)).collect();
        features
    }

    pub fn fetch_feature_node(&self, feature: FeatureId) -> rusqlite::Result<Option<NodeId>> {
        let mut stmt = match self.conn.prepare_cached(FEATURE_NODE_BY_ID) {
            Ok(s) => s,
            Err(e) if is_no_such_table(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        stmt.query_row(params![feature], |r| r.get(0)).optional()
    }

    pub fn fetch_meta(&self, key: &str) -> rusqlite::Result<Option<String>> {
        let mut stmt = match self.conn.prepare_cached(META_BY_KEY) {
            Ok(s) => s,
            Err(e) if is_no_such_table(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(stmt.query_row(params![key], |r| r.get::<_, Option<String>>(0)).optional()?.flatten())
    }

    pub fn load_graph_data(&self) -> NavResult<GraphData> {
        Ok(GraphData { nodes: self.iter_nodes()?, edges: self.iter_edges()?, features: self.iter_features()? })
    }
}

/// Reads the whole graph from a SQLite file on every call. Each produced
/// snapshot gets the next version number.
pub struct SqliteGraphLoader {
    path: PathBuf,
    open: DbOpenConfig,
    options: SnapshotOptions,
    version: AtomicU64,
}

impl SqliteGraphLoader {
    pub fn new(path: impl Into<PathBuf>, open: DbOpenConfig, options: SnapshotOptions) -> Self {
        Self { path: path.into(), open, options, version: AtomicU64::new(0) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GraphLoader for SqliteGraphLoader {
    fn current_snapshot(&self) -> NavResult<GraphSnapshot> {
        let db = Database::open_read_only(&self.path, &self.open)?;
        let data = db.load_graph_data()?;
        if let Some(source) = db.fetch_meta("source")? {
            debug!(source = %source, "graph database provenance");
        }
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            path = %self.path.display(),
            version,
            nodes = data.nodes.len(),
            edges = data.edges.len(),
            features = data.features.len(),
            "graph data read"
        );
        GraphSnapshot::build(data, version, &self.options)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

pub const FEATURE_CACHE_CAPACITY: usize = 4096;

/// Looks features up directly in the database, remembering recent answers.
///
/// A resolver that follows a [`SnapshotStore`] drops its cache and reopens the
/// database whenever a new snapshot version is published.
pub struct SqliteFeatureResolver {
    path: Option<PathBuf>,
    open: DbOpenConfig,
    store: Option<Arc<SnapshotStore>>,
    state: Mutex<ResolverState>,
}

struct ResolverState {
    db: Database,
    cache: LruCache<FeatureId, NodeId>,
    /// Snapshot version the cached answers were read under.
    version: u64,
}

impl SqliteFeatureResolver {
    pub fn open(path: impl AsRef<Path>, cfg: &DbOpenConfig, capacity: usize) -> NavResult<Self> {
        let db = Database::open_read_only(path.as_ref(), cfg)?;
        let mut resolver = Self::from_database(db, capacity);
        resolver.path = Some(path.as_ref().to_path_buf());
        resolver.open = cfg.clone();
        Ok(resolver)
    }

    /// A resolver over an already open connection. It cannot reopen, so a
    /// publish only clears the cache.
    pub fn from_database(db: Database, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            path: None,
            open: DbOpenConfig::default(),
            store: None,
            state: Mutex::new(ResolverState { db, cache: LruCache::new(cap), version: 0 }),
        }
    }

    /// Ties cache lifetime to the snapshots published in `store`.
    pub fn following(mut self, store: Arc<SnapshotStore>) -> Self {
        let version = store.current().map(|s| s.version()).unwrap_or(0);
        if let Ok(state) = self.state.get_mut() {
            state.version = version;
        }
        self.store = Some(store);
        self
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.cache.clear();
        }
    }

    fn sync(&self, state: &mut ResolverState) -> NavResult<()> {
        let Some(store) = &self.store else { return Ok(()) };
        let Ok(snapshot) = store.current() else { return Ok(()) };
        if snapshot.version() == state.version {
            return Ok(());
        }
        if let Some(path) = &self.path {
            state.db = Database::open_read_only(path, &self.open)?;
        }
        state.cache.clear();
        debug!(from = state.version, to = snapshot.version(), "feature cache reset after publish");
        state.version = snapshot.version();
        Ok(())
    }
}

impl FeatureResolver for SqliteFeatureResolver {
    fn node_id_for(&self, feature: FeatureId) -> NavResult<NodeId> {
        let mut state = self.state.lock().map_err(|_| NavError::integrity("feature database lock poisoned"))?;
        self.sync(&mut state)?;
        if let Some(node) = state.cache.get(&feature).copied() {
            return Ok(node);
        }
        let found = state.db.fetch_feature_node(feature)?;
        match found {
            Some(node) => {
                state.cache.put(feature, node);
                Ok(node)
            }
            None => {
                warn!(feature_id = feature, "feature not found");
                Err(NavError::not_found(format!("feature {}", feature)))
            }
        }
    }
}
