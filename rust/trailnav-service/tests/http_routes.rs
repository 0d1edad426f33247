use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`
use trailnav_core::geodesy::equator_degrees;
use trailnav_core::{
    Edge, Feature, GraphData, GraphLoader, InMemoryGraphLoader, LonLat, Navigator, Node, RoutingConfig,
    SnapshotFeatureResolver, SnapshotStore,
};
use trailnav_service::{build_router, AppState};

fn at_m(x: f64, y: f64) -> LonLat {
    LonLat::new(equator_degrees(x), equator_degrees(y))
}

fn node_at(id: i64, x: f64, y: f64) -> Node {
    let p = at_m(x, y);
    Node::new(id, p.lon, p.lat)
}

fn feature(id: i64, node_id: i64, category: &str, name: &str) -> Feature {
    Feature { id, node_id, category: category.into(), name: name.into(), description: None, rating: None }
}

fn park() -> GraphData {
    GraphData {
        nodes: vec![
            node_at(1, 0.0, 0.0).named("ENTRY_MAIN"),
            node_at(2, 50.0, 0.0),
            node_at(3, 100.0, 0.0),
            node_at(4, 1000.0, 1000.0).named("Island"),
        ],
        edges: vec![Edge::new(10, 1, 2, 50.0), Edge::new(11, 2, 3, 50.0)],
        features: vec![
            feature(100, 2, "food", "Kiosk"),
            feature(101, 3, "food", "Cafe"),
            feature(102, 3, "view", "Lookout"),
        ],
    }
}

fn state_with(data: Option<GraphData>) -> AppState {
    let config = RoutingConfig::default();
    let store = Arc::new(SnapshotStore::new());
    let loader = data.map(|d| {
        let loader: Arc<dyn GraphLoader> = Arc::new(InMemoryGraphLoader::new(d, config.snapshot_options()));
        store.refresh(loader.as_ref()).unwrap();
        loader
    });
    let features = Arc::new(SnapshotFeatureResolver::new(store.clone()));
    AppState::new(Arc::new(Navigator::new(store, features, config)), loader)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

fn origin() -> Value {
    json!({"lon": 0.0, "lat": 0.0})
}

#[tokio::test]
async fn health_ready_and_version() {
    let app = build_router(state_with(Some(park())));
    let (status, body) = get(app.clone(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["snapshot_version"], 1);
    assert_eq!(body["counts"]["nodes"], 4);
    assert_eq!(body["counts"]["entry_nodes"], 1);

    let (status, body) = get(app, "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["core_version"], trailnav_core::version());
    assert_eq!(body["snapshot_version"], 1);
}

#[tokio::test]
async fn not_loaded_is_unavailable() {
    let app = build_router(state_with(None));
    let (status, body) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    let (status, body) = post_json(app.clone(), "/route", json!({"from": origin(), "to": {"node": 3}})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "graph_unavailable");

    let (status, _) = post_json(app, "/admin/reload", json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn route_to_node_and_feature() {
    let app = build_router(state_with(Some(park())));
    let (status, body) = post_json(app.clone(), "/route", json!({"from": origin(), "to": {"node": 3}})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["start"]["mode"], "direct");
    assert_eq!(body["start"]["node_id"], 1);
    assert_eq!(body["destination_node"], 3);
    assert_eq!(body["geometry"]["type"], "LineString");
    assert_eq!(body["geometry"]["coordinates"].as_array().unwrap().len(), 3);
    assert_eq!(body["segments"].as_array().unwrap().len(), 2);
    assert!((body["distance_m"].as_f64().unwrap() - 100.0).abs() < 1e-6);
    assert!(body.get("alternatives").is_none());

    let (status, body) = post_json(
        app,
        "/route",
        json!({"from": origin(), "to": {"feature": 100}, "profile": "walking"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["destination_node"], 2);
    assert_eq!(body["profile"], "walking");
    assert_eq!(body["duration_s"], (50.0_f64 / 1.35).round() as u64);
}

#[tokio::test]
async fn route_errors_map_to_status_codes() {
    let app = build_router(state_with(Some(park())));
    let (status, body) = post_json(app.clone(), "/route", json!({"from": origin(), "to": {"node": 4}})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = post_json(app.clone(), "/route", json!({"from": origin(), "to": {"node": 999}})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
        post_json(app.clone(), "/route", json!({"from": origin(), "to": {"node": 3}, "profile": "jetpack"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) =
        post_json(app.clone(), "/route", json!({"from": {"lon": 0.0, "lat": 95.0}, "to": {"node": 3}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("POST")
        .uri("/route")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn route_alternatives_are_listed() {
    let mut data = park();
    data.edges.push(Edge::new(12, 1, 3, 150.0));
    let app = build_router(state_with(Some(data)));
    let (status, body) =
        post_json(app, "/route", json!({"from": origin(), "to": {"node": 3}, "alternatives": 1})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["cost"], 100.0);
    let alts = body["alternatives"].as_array().unwrap();
    assert_eq!(alts.len(), 1);
    assert_eq!(alts[0]["cost"], 150.0);
}

#[tokio::test]
async fn nearest_features_paginate() {
    let app = build_router(state_with(Some(park())));
    let (status, body) = get(app.clone(), "/features/nearest?lon=0&lat=0&radius_m=200&category=food&limit=1").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["items"][0]["id"], 100);
    assert!((body["items"][0]["distance_m"].as_f64().unwrap() - 50.0).abs() < 1e-6);
    assert_eq!(body["pagination"]["totalItems"], 2);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["hasNextPage"], true);

    let (status, body) =
        get(app.clone(), "/features/nearest?lon=0&lat=0&radius_m=200&category=food&limit=1&page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["id"], 101);
    assert_eq!(body["pagination"]["hasPreviousPage"], true);

    let (status, body) = get(app.clone(), "/features/nearest?q=look").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["name"], "Lookout");
}

#[tokio::test]
async fn nearest_features_reject_bad_queries() {
    let app = build_router(state_with(Some(park())));
    for uri in [
        "/features/nearest?lon=0",
        "/features/nearest?radius_m=10",
        "/features/nearest?limit=0",
        "/features/nearest?limit=101",
        "/features/nearest?page=5",
        "/features/nearest?bbox=1,2,3",
        "/features/nearest?lon=abc&lat=0",
    ] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
    }
}

#[tokio::test]
async fn graph_area_and_snap() {
    let app = build_router(state_with(Some(park())));
    let bbox = format!("{},{},{},{}", -0.0001, -0.0001, equator_degrees(60.0), 0.0001);
    let (status, body) = get(app.clone(), &format!("/graph/area?bbox={bbox}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ids: Vec<i64> = body["nodes"].as_array().unwrap().iter().map(|n| n["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2]);
    let edges: Vec<i64> = body["edges"].as_array().unwrap().iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert!(edges.contains(&10));

    let (status, body) = get(app.clone(), "/graph/area?category=boardwalk").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["nodes"].as_array().unwrap().is_empty());
    assert!(body["edges"].as_array().unwrap().is_empty());

    let (status, _) = get(app.clone(), "/graph/area?bbox=5,5,1,1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let p = at_m(48.0, 3.0);
    let (status, body) = get(app.clone(), &format!("/graph/snap?lon={}&lat={}", p.lon, p.lat)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["node_id"], 2);
    assert!(body["edge_distance_m"].as_f64().unwrap() <= body["node_distance_m"].as_f64().unwrap());

    let (status, _) = get(app, "/graph/snap?lon=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_reload_publishes_new_version() {
    let app = build_router(state_with(Some(park())));
    let (status, body) = post_json(app.clone(), "/admin/reload", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reloaded"], true);
    assert_eq!(body["version"], 2);

    let (_, body) = get(app, "/readyz").await;
    assert_eq!(body["snapshot_version"], 2);
}

fn grid(side: i64) -> GraphData {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let id = |x: i64, y: i64| y * side + x;
    for y in 0..side {
        for x in 0..side {
            nodes.push(node_at(id(x, y), x as f64 * 10.0, y as f64 * 10.0));
            if x + 1 < side {
                edges.push(Edge::new(edges.len() as i64, id(x, y), id(x + 1, y), 10.0));
            }
            if y + 1 < side {
                edges.push(Edge::new(edges.len() as i64, id(x, y), id(x, y + 1), 10.0));
            }
        }
    }
    GraphData { nodes, edges, features: vec![] }
}

#[tokio::test]
async fn slow_route_hits_deadline() {
    let side = 150;
    let state = state_with(Some(grid(side))).with_request_timeout(Duration::ZERO);
    let app = build_router(state);
    let (status, body) =
        post_json(app, "/route", json!({"from": origin(), "to": {"node": side * side - 1}, "alternatives": 5})).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT, "{body}");
    assert_eq!(body["error"]["code"], "deadline_exceeded");
}
