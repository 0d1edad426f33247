pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY,
    name TEXT,
    lon REAL NOT NULL,
    lat REAL NOT NULL,
    altitude REAL
);
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY,
    source INTEGER NOT NULL REFERENCES nodes(id),
    target INTEGER NOT NULL REFERENCES nodes(id),
    cost REAL NOT NULL,
    reverse_cost REAL,
    category TEXT NOT NULL DEFAULT 'walkway',
    geometry TEXT
);
CREATE TABLE IF NOT EXISTS features (
    id INTEGER PRIMARY KEY,
    node_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    rating REAL
);
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT
);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
CREATE INDEX IF NOT EXISTS idx_features_node ON features(node_id);
";

pub const ALL_NODES: &str = "SELECT id, name, lon, lat, altitude FROM nodes ORDER BY id";
pub const ALL_EDGES: &str = "SELECT id, source, target, cost, reverse_cost, category, geometry FROM edges ORDER BY id";
pub const ALL_FEATURES: &str = "SELECT id, node_id, category, name, description, rating FROM features ORDER BY id";
pub const FEATURE_NODE_BY_ID: &str = "SELECT node_id FROM features WHERE id = ?1";
pub const META_BY_KEY: &str = "SELECT value FROM meta WHERE key = ?1";

pub const INSERT_NODE: &str = "INSERT INTO nodes (id, name, lon, lat, altitude) VALUES (?1, ?2, ?3, ?4, ?5)";
pub const INSERT_EDGE: &str =
    "INSERT INTO edges (id, source, target, cost, reverse_cost, category, geometry) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
pub const INSERT_FEATURE: &str =
    "INSERT INTO features (id, node_id, category, name, description, rating) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
pub const UPSERT_META: &str = "INSERT INTO meta (key, value) VALUES (?1, ?2) \
    ON CONFLICT(key) DO UPDATE SET value = excluded.value";
