use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use trailnav_core::db::queries::{INSERT_EDGE, INSERT_FEATURE, INSERT_NODE, SCHEMA, UPSERT_META};
use trailnav_core::GraphData;

/// Creates the schema and inserts everything in one transaction. Either the
/// whole graph lands or nothing does.
pub fn write_graph(conn: &mut Connection, data: &GraphData, source: &str) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA).context("create schema")?;
    {
        let mut stmt = tx.prepare(INSERT_NODE)?;
        for n in &data.nodes {
            stmt.execute(params![n.id, n.name, n.position.lon, n.position.lat, n.altitude])
                .with_context(|| format!("insert node {}", n.id))?;
        }
        let mut stmt = tx.prepare(INSERT_EDGE)?;
        for e in &data.edges {
            let geometry = if e.geometry.is_empty() { None } else { Some(serde_json::to_string(&e.geometry)?) };
            stmt.execute(params![e.id, e.source, e.target, e.cost, e.reverse_cost, e.category, geometry])
                .with_context(|| format!("insert edge {}", e.id))?;
        }
        let mut stmt = tx.prepare(INSERT_FEATURE)?;
        for f in &data.features {
            stmt.execute(params![f.id, f.node_id, f.category, f.name, f.description, f.rating])
                .with_context(|| format!("insert feature {}", f.id))?;
        }
        let imported_at = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let mut stmt = tx.prepare(UPSERT_META)?;
        for (k, v) in [
            ("imported_at", imported_at.to_string()),
            ("source", source.to_string()),
            ("node_count", data.nodes.len().to_string()),
            ("edge_count", data.edges.len().to_string()),
            ("feature_count", data.features.len().to_string()),
        ] {
            stmt.execute(params![k, v])?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailnav_core::{Edge, Node};

    #[test]
    fn writes_rows_and_meta() {
        let data = GraphData {
            nodes: vec![Node::new(1, 0.0, 0.0), Node::new(2, 0.001, 0.0).with_altitude(4.0)],
            edges: vec![Edge::new(3, 1, 2, 111.0).one_way()],
            features: vec![],
        };
        let mut conn = Connection::open_in_memory().unwrap();
        write_graph(&mut conn, &data, "unit").unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 2);
        let (rev, geom): (Option<f64>, Option<String>) =
            conn.query_row("SELECT reverse_cost, geometry FROM edges WHERE id = 3", [], |r| Ok((r.get(0)?, r.get(1)?))).unwrap();
        assert_eq!(rev, None);
        assert_eq!(geom, None);
        let count: String = conn.query_row("SELECT value FROM meta WHERE key = 'edge_count'", [], |r| r.get(0)).unwrap();
        assert_eq!(count, "1");
    }

    #[test]
    fn duplicate_ids_roll_back() {
        let data = GraphData { nodes: vec![Node::new(1, 0.0, 0.0), Node::new(1, 1.0, 0.0)], ..GraphData::default() };
        let mut conn = Connection::open_in_memory().unwrap();
        assert!(write_graph(&mut conn, &data, "unit").is_err());
        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'nodes'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 0);
    }
}
