use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use trailnav_builder::build::import;

#[derive(Parser, Debug)]
#[command(name = "trailnav-builder", version, about = "Import a GeoJSON walkway network into a trailnav graph database")]
struct Args {
    /// GeoJSON FeatureCollection with node, edge and feature items
    #[arg(long = "geojson", value_name = "PATH")]
    geojson: PathBuf,

    /// Output SQLite database
    #[arg(long = "out-db", value_name = "PATH")]
    out_db: PathBuf,

    /// Overwrite an existing output database
    #[arg(long)]
    replace: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_ansi(false).json().finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let args = Args::parse();
    info!(?args, "starting builder");

    match import(&args.geojson, &args.out_db, args.replace) {
        Ok(counts) => {
            info!(nodes = counts.nodes, edges = counts.edges, features = counts.features, "import done");
            Ok(())
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "import failed");
            Err(e)
        }
    }
}
