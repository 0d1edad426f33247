use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tracing::{info, warn};

use super::GraphSnapshot;
use crate::error::{NavError, NavResult};
use crate::loader::GraphLoader;

/// Holds the published snapshot. Readers take an `Arc` and keep using it for the
/// whole request even if a refresh publishes a newer one meanwhile.
#[derive(Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<GraphSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: GraphSnapshot) -> Self {
        let store = Self::new();
        store.publish(snapshot);
        store
    }

    pub fn current(&self) -> NavResult<Arc<GraphSnapshot>> {
        self.current.load_full().ok_or(NavError::GraphUnavailable)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// Swaps in `snapshot` and returns the one it replaced.
    pub fn publish(&self, snapshot: GraphSnapshot) -> Option<Arc<GraphSnapshot>> {
        self.current.swap(Some(Arc::new(snapshot)))
    }

    /// Builds a snapshot from `loader` and publishes it. On failure the previous
    /// snapshot stays in place.
    pub fn refresh(&self, loader: &dyn GraphLoader) -> NavResult<u64> {
        let snapshot = loader.current_snapshot()?;
        let version = snapshot.version();
        let counts = snapshot.counts();
        let previous = self.publish(snapshot).map(|s| s.version());
        info!(
            version,
            previous = ?previous,
            nodes = counts.nodes,
            edges = counts.edges,
            features = counts.features,
            "graph snapshot published"
        );
        Ok(version)
    }

    /// `refresh` with up to `retries` further attempts, doubling `backoff` each time.
    /// Blocks the calling thread while waiting.
    pub fn refresh_with_retry(&self, loader: &dyn GraphLoader, retries: u32, backoff: Duration) -> NavResult<u64> {
        let mut delay = backoff;
        let mut attempt = 0;
        loop {
            match self.refresh(loader) {
                Ok(v) => return Ok(v),
                Err(e) if attempt < retries && is_transient(&e) => {
                    attempt += 1;
                    warn!(attempt, retries, delay_ms = delay.as_millis() as u64, error = %e, "graph reload failed; retrying");
                    std::thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Integrity failures will not fix themselves on retry.
fn is_transient(e: &NavError) -> bool {
    matches!(e, NavError::Storage(_) | NavError::GraphUnavailable)
}
