pub mod geojson;
pub mod schema;

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use tracing::info;

use trailnav_core::snapshot::SnapshotCounts;
use trailnav_core::{GraphSnapshot, SnapshotOptions};

/// Parses `input`, checks it the way the loader will, and writes `out_db`.
/// An existing database is only overwritten with `replace`.
pub fn import(input: &Path, out_db: &Path, replace: bool) -> Result<SnapshotCounts> {
    let text = fs::read_to_string(input).with_context(|| format!("failed to read {:?}", input))?;
    let data = geojson::parse_feature_collection(&text)?;

    let counts = GraphSnapshot::build(data.clone(), 0, &SnapshotOptions::default())
        .context("graph failed integrity checks")?
        .counts();

    if out_db.exists() {
        if !replace {
            bail!("{:?} already exists; pass --replace to overwrite", out_db);
        }
        fs::remove_file(out_db).with_context(|| format!("failed to remove {:?}", out_db))?;
    }
    let mut conn = Connection::open(out_db).with_context(|| format!("failed to create {:?}", out_db))?;
    schema::write_graph(&mut conn, &data, &input.display().to_string())?;
    info!(
        out = %out_db.display(),
        nodes = counts.nodes,
        edges = counts.edges,
        features = counts.features,
        entry_nodes = counts.entry_nodes,
        "graph database written"
    );
    Ok(counts)
}
