use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::state::AppState;

/// Reloads the graph on a fixed interval. Returns `None` when there is no loader
/// or no interval. A failed reload keeps the current snapshot.
pub fn spawn_refresh(state: AppState, every: Option<Duration>) -> Option<JoinHandle<()>> {
    let every = every?;
    let loader = state.loader.clone()?;
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; startup already loaded once.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let store = state.store().clone();
            let loader = loader.clone();
            let (retries, backoff) = (state.reload_retries, state.reload_backoff);
            let res =
                tokio::task::spawn_blocking(move || store.refresh_with_retry(loader.as_ref(), retries, backoff)).await;
            match res {
                Ok(Ok(version)) => info!(version, "periodic graph refresh done"),
                Ok(Err(e)) => warn!(error = %e, "periodic graph refresh failed; previous snapshot stays active"),
                Err(e) => error!(error = %e, "graph refresh task aborted"),
            }
        }
    }))
}
