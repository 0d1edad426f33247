use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, info_span, warn};
use trailnav_core::{AreaQuery, BoundingBox, FeatureQuery, LonLat, RouteRequest};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Healthz {
    pub status: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeaturesParams {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub radius_m: Option<f64>,
    pub bbox: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AreaParams {
    pub bbox: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapParams {
    pub lon: f64,
    pub lat: f64,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/version", get(version))
        .route("/route", post(route))
        .route("/features/nearest", get(nearest_features))
        .route("/graph/area", get(graph_area))
        .route("/graph/snap", get(graph_snap))
        .route("/admin/reload", post(reload))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(Healthz { status: "ok" }))
}

async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.store().current() {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "ready": true,
                "snapshot_version": snapshot.version(),
                "loaded_at": snapshot.loaded_at(),
                "counts": snapshot.counts(),
            })),
        )
            .into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"ready": false, "error": e.to_string()}))).into_response(),
    }
}

async fn version(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot_version = state.store().current().ok().map(|s| s.version());
    (
        StatusCode::OK,
        Json(json!({
            "service_version": env!("CARGO_PKG_VERSION"),
            "core_version": trailnav_core::version(),
            "snapshot_version": snapshot_version,
        })),
    )
}

fn optional_bbox(raw: Option<&str>) -> Result<Option<BoundingBox>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(s.parse::<BoundingBox>()?)),
        None => Ok(None),
    }
}

/// Runs the routing search off the async runtime. When the deadline passes the
/// search is told to stop and the caller gets a 504 right away.
async fn route(
    State(state): State<AppState>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let span = info_span!("route_request", to = ?req.to, alternatives = req.alternatives);

    let cancel = Arc::new(AtomicBool::new(false));
    let navigator = state.navigator.clone();
    let flag = cancel.clone();
    let task_span = span.clone();
    let task =
        tokio::task::spawn_blocking(move || task_span.in_scope(|| navigator.resolve_route(&req, Some(&flag))));

    match tokio::time::timeout(state.request_timeout, task).await {
        Ok(Ok(Ok(plan))) => {
            let _enter = span.enter();
            info!(
                snapshot_version = plan.snapshot_version,
                mode = plan.start.mode.as_str(),
                distance_m = plan.route.distance_m,
                duration_s = plan.route.duration_s,
                "route done"
            );
            Ok((StatusCode::OK, Json(plan)))
        }
        Ok(Ok(Err(e))) => Err(e.into()),
        Ok(Err(join)) => {
            error!(error = %join, "route task failed");
            Err(AppError::Internal(anyhow::anyhow!("route task failed: {}", join)))
        }
        Err(_) => {
            cancel.store(true, Ordering::Relaxed);
            let ms = state.request_timeout.as_millis();
            let _enter = span.enter();
            warn!(timeout_ms = ms as u64, "route deadline exceeded");
            Err(AppError::DeadlineExceeded(format!("routing took longer than {} ms", ms)))
        }
    }
}

async fn nearest_features(
    State(state): State<AppState>,
    params: Result<Query<FeaturesParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(p) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut query = FeatureQuery::new();
    match (p.lon, p.lat) {
        (Some(lon), Some(lat)) => query = query.near(LonLat::new(lon, lat)),
        (None, None) => {}
        _ => return Err(AppError::BadRequest("lon and lat must be given together".into())),
    }
    if let Some(r) = p.radius_m {
        query = query.within_radius(r);
    }
    if let Some(b) = optional_bbox(p.bbox.as_deref())? {
        query = query.in_bbox(b);
    }
    if let Some(c) = p.category {
        query = query.category(c);
    }
    if let Some(q) = p.q {
        query = query.matching(q);
    }
    if let Some(page) = p.page {
        query = query.page(page);
    }
    if let Some(limit) = p.limit {
        query = query.limit(limit);
    }
    let page = state.navigator.query_nearest_features(&query)?;
    Ok((StatusCode::OK, Json(page)))
}

async fn graph_area(
    State(state): State<AppState>,
    params: Result<Query<AreaParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(p) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let query = AreaQuery { bbox: optional_bbox(p.bbox.as_deref())?, category: p.category };
    let area = state.navigator.query_graph_in_area(&query)?;
    Ok((StatusCode::OK, Json(area)))
}

async fn graph_snap(
    State(state): State<AppState>,
    params: Result<Query<SnapParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(p) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let report = state.navigator.snap(LonLat::new(p.lon, p.lat))?;
    Ok((StatusCode::OK, Json(report)))
}

async fn reload(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let Some(loader) = state.loader.clone() else {
        return Err(AppError::Unavailable("no graph source configured".into()));
    };
    let store = state.store().clone();
    let (retries, backoff) = (state.reload_retries, state.reload_backoff);
    let version = tokio::task::spawn_blocking(move || store.refresh_with_retry(loader.as_ref(), retries, backoff))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("reload task failed: {}", e)))??;
    info!(version, "admin reload done");
    Ok((StatusCode::OK, Json(json!({"reloaded": true, "version": version}))))
}
