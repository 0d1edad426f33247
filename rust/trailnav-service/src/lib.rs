use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use trailnav_core::db::{SqliteFeatureResolver, SqliteGraphLoader, FEATURE_CACHE_CAPACITY};
use trailnav_core::{FeatureResolver, GraphLoader, Navigator, SnapshotFeatureResolver, SnapshotStore};

pub mod config;
pub mod errors;
pub mod refresh;
pub mod routes;
pub mod state;

pub use config::{Config, FeatureSource};
pub use errors::AppError;
pub use refresh::spawn_refresh;
pub use routes::build_router;
pub use state::AppState;

/// Wires loader, store and navigator from `cfg` and attempts the first load.
/// A failed first load is logged; the service starts and reports not-ready.
pub fn init_state(cfg: &Config) -> anyhow::Result<AppState> {
    let store = Arc::new(SnapshotStore::new());
    let loader: Option<Arc<dyn GraphLoader>> = cfg.db_path.as_ref().map(|path| {
        Arc::new(SqliteGraphLoader::new(path.clone(), cfg.db_open.clone(), cfg.routing.snapshot_options()))
            as Arc<dyn GraphLoader>
    });

    let features: Arc<dyn FeatureResolver> = match (cfg.feature_source, cfg.db_path.as_ref()) {
        (FeatureSource::Sqlite, Some(path)) => Arc::new(
            SqliteFeatureResolver::open(path, &cfg.db_open, FEATURE_CACHE_CAPACITY)
                .with_context(|| format!("open feature lookup database {}", path.display()))?
                .following(store.clone()),
        ),
        (FeatureSource::Sqlite, None) => {
            warn!("TRAILNAV_FEATURE_SOURCE=sqlite without TRAILNAV_DB; using the snapshot");
            Arc::new(SnapshotFeatureResolver::new(store.clone()))
        }
        (FeatureSource::Snapshot, _) => Arc::new(SnapshotFeatureResolver::new(store.clone())),
    };

    match &loader {
        Some(l) => match store.refresh_with_retry(l.as_ref(), cfg.reload_retries, config::RELOAD_BACKOFF) {
            Ok(version) => info!(version, source = %l.describe(), "initial graph loaded"),
            Err(e) => warn!(error = %e, source = %l.describe(), "initial graph load failed; serving not-ready"),
        },
        None => warn!("TRAILNAV_DB not set; no graph will be loaded"),
    }

    let navigator = Arc::new(Navigator::new(store, features, cfg.routing.clone()));
    Ok(AppState::new(navigator, loader)
        .with_request_timeout(cfg.request_timeout())
        .with_reload_retries(cfg.reload_retries))
}
