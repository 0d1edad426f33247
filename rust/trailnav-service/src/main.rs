use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use trailnav_service::{build_router, init_state, spawn_refresh, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cfg = Config::from_env()?;
    let state = tokio::task::spawn_blocking({
        let cfg = cfg.clone();
        move || init_state(&cfg)
    })
    .await
    .context("startup task failed")??;

    let _refresh = spawn_refresh(state.clone(), cfg.refresh_interval());
    let app = build_router(state);
    let addr = cfg.addr();
    tracing::info!(core_version = %trailnav_core::version(), addr = %addr, "starting trailnav-service");
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
