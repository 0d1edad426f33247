use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use trailnav_core::db::DbOpenConfig;
use trailnav_core::RoutingConfig;

pub const DEFAULT_REFRESH_SECS: u64 = 300;
pub const DEFAULT_RELOAD_RETRIES: u32 = 3;
pub const RELOAD_BACKOFF: Duration = Duration::from_millis(250);
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Where `Destination::Feature` lookups are answered from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureSource {
    /// The published graph snapshot.
    Snapshot,
    /// Direct queries against the graph database, cached.
    Sqlite,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: Option<PathBuf>,
    pub refresh_secs: u64,
    pub reload_retries: u32,
    pub request_timeout_ms: u64,
    pub feature_source: FeatureSource,
    pub routing: RoutingConfig,
    pub db_open: DbOpenConfig,
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("TRAILNAV_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parsed::<u16>("TRAILNAV_PORT").unwrap_or(8080);
        let db_path = env::var("TRAILNAV_DB").ok().filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        let refresh_secs = parsed::<u64>("TRAILNAV_REFRESH_SECS").unwrap_or(DEFAULT_REFRESH_SECS);
        let reload_retries = parsed::<u32>("TRAILNAV_RELOAD_RETRIES").unwrap_or(DEFAULT_RELOAD_RETRIES);
        let request_timeout_ms = parsed::<u64>("TRAILNAV_REQUEST_TIMEOUT_MS")
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        let feature_source = match env::var("TRAILNAV_FEATURE_SOURCE").map(|s| s.trim().to_ascii_lowercase()) {
            Ok(s) if s == "sqlite" => FeatureSource::Sqlite,
            _ => FeatureSource::Snapshot,
        };

        Ok(Self {
            host,
            port,
            db_path,
            refresh_secs,
            reload_retries,
            request_timeout_ms,
            feature_source,
            routing: RoutingConfig::from_env(),
            db_open: DbOpenConfig::from_env(),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `None` when periodic refresh is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_secs > 0).then(|| Duration::from_secs(self.refresh_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            db_path: None,
            refresh_secs: DEFAULT_REFRESH_SECS,
            reload_retries: DEFAULT_RELOAD_RETRIES,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            feature_source: FeatureSource::Snapshot,
            routing: RoutingConfig::default(),
            db_open: DbOpenConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.refresh_interval(), Some(Duration::from_secs(300)));
        assert_eq!(cfg.request_timeout(), Duration::from_millis(5_000));
        assert_eq!(cfg.feature_source, FeatureSource::Snapshot);
    }

    #[test]
    fn zero_refresh_disables_timer() {
        let cfg = Config { refresh_secs: 0, ..Config::default() };
        assert_eq!(cfg.refresh_interval(), None);
    }
}
