use std::sync::Arc;
use std::time::Duration;

use trailnav_core::{GraphLoader, Navigator, SnapshotStore};

use crate::config::{DEFAULT_RELOAD_RETRIES, DEFAULT_REQUEST_TIMEOUT_MS, RELOAD_BACKOFF};

#[derive(Clone)]
pub struct AppState {
    pub navigator: Arc<Navigator>,
    /// `None` when the service runs without a graph source; reloads are refused.
    pub loader: Option<Arc<dyn GraphLoader>>,
    pub request_timeout: Duration,
    pub reload_retries: u32,
    pub reload_backoff: Duration,
}

impl AppState {
    pub fn new(navigator: Arc<Navigator>, loader: Option<Arc<dyn GraphLoader>>) -> Self {
        Self {
            navigator,
            loader,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            reload_retries: DEFAULT_RELOAD_RETRIES,
            reload_backoff: RELOAD_BACKOFF,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_reload_retries(mut self, retries: u32) -> Self {
        self.reload_retries = retries;
        self
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        self.navigator.store()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("loader", &self.loader.as_ref().map(|l| l.describe()))
            .field("snapshot_loaded", &self.store().is_loaded())
            .field("request_timeout", &self.request_timeout)
            .field("reload_retries", &self.reload_retries)
            .finish()
    }
}
