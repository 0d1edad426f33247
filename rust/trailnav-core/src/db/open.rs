use std::env;
use std::fmt::{Display, Formatter};
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

/// PRAGMA toggles applied when opening a graph database for reading.
#[derive(Clone, Debug, PartialEq)]
pub struct DbOpenConfig {
    /// PRAGMA query_only=ON.
    pub query_only: bool,
    /// PRAGMA cache_size = -kb when set and > 0.
    pub cache_size_kb: Option<i64>,
    /// PRAGMA mmap_size = bytes when set and > 0.
    pub mmap_size_bytes: Option<i64>,
    pub temp_store: Option<TempStore>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TempStore {
    Memory,
    File,
}

impl Display for TempStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TempStore::Memory => write!(f, "MEMORY"),
            TempStore::File => write!(f, "FILE"),
        }
    }
}

impl Default for DbOpenConfig {
    fn default() -> Self {
        Self {
            query_only: true,
            cache_size_kb: Some(64_000),
            mmap_size_bytes: Some(134_217_728),
            temp_store: Some(TempStore::Memory),
        }
    }
}

impl DbOpenConfig {
    /// Load toggles from environment variables. Missing/invalid values fall back to defaults.
    ///
    /// Variables:
    /// - TRAILNAV_SQLITE_QUERY_ONLY: "1"/"0" (default 1)
    /// - TRAILNAV_SQLITE_CACHE_SIZE_KB: integer KB; 0 disables
    /// - TRAILNAV_SQLITE_MMAP_SIZE: integer bytes; 0 disables
    /// - TRAILNAV_SQLITE_TEMP_STORE: "MEMORY" or "FILE"; empty disables
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = get("TRAILNAV_SQLITE_QUERY_ONLY") {
            cfg.query_only = v.trim() != "0";
        }
        if let Some(v) = get("TRAILNAV_SQLITE_CACHE_SIZE_KB") {
            cfg.cache_size_kb = v.trim().parse::<i64>().ok().filter(|n| *n > 0);
        }
        if let Some(v) = get("TRAILNAV_SQLITE_MMAP_SIZE") {
            cfg.mmap_size_bytes = v.trim().parse::<i64>().ok().filter(|n| *n > 0);
        }
        if let Some(v) = get("TRAILNAV_SQLITE_TEMP_STORE") {
            cfg.temp_store = match v.trim().to_ascii_uppercase().as_str() {
                "MEMORY" => Some(TempStore::Memory),
                "FILE" => Some(TempStore::File),
                _ => None,
            };
        }
        cfg
    }
}

/// Opens `path` read-only, falling back to a plain open guarded by query_only.
/// PRAGMA failures are logged and otherwise ignored.
pub fn open_read_only_with_config<P: AsRef<Path>>(path: P, cfg: &DbOpenConfig) -> rusqlite::Result<Connection> {
    let path = path.as_ref();
    let conn = match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI) {
        Ok(c) => c,
        Err(_) => match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
            Ok(c) => c,
            Err(_) => Connection::open(path)?,
        },
    };
    apply_pragmas(&conn, cfg);
    Ok(conn)
}

fn apply_pragmas(conn: &Connection, cfg: &DbOpenConfig) {
    let mut pragmas = vec!["PRAGMA foreign_keys = ON".to_string()];
    if cfg.query_only {
        pragmas.push("PRAGMA query_only = ON".to_string());
    }
    if let Some(kb) = cfg.cache_size_kb.filter(|kb| *kb > 0) {
        pragmas.push(format!("PRAGMA cache_size = -{}", kb));
    }
    if let Some(bytes) = cfg.mmap_size_bytes.filter(|b| *b > 0) {
        pragmas.push(format!("PRAGMA mmap_size = {}", bytes));
    }
    if let Some(ts) = cfg.temp_store {
        pragmas.push(format!("PRAGMA temp_store = {}", ts));
    }
    for p in pragmas {
        // Some PRAGMAs return a row; execute_batch tolerates that.
        if let Err(e) = conn.execute_batch(&p) {
            debug!(pragma = %p, error = %e, "pragma not applied");
        }
    }
}
