//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use moviedb::{AppState, catalog::Catalog, db, routes};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Router over a fresh database file. Keep the `TempDir` alive for the test.
pub async fn app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("movies.db").display());
    let db = db::connect_and_migrate(&url).await.unwrap();
    let state = Arc::new(AppState { catalog: Catalog::new(db) });
    (dir, routes::router(state))
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header("content-type", "application/json");
            Body::from(json.to_string())
        },
        None => Body::empty(),
    };
    app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
}

pub async fn send_raw(app: &Router, method: &str, uri: &str, raw: &'static str) -> Response<Body> {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(raw))
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn json(response: Response<Body>) -> Value {
    assert_eq!(response.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Creates a resource and returns the id from its `Location` header.
pub async fn create(app: &Router, uri: &str, body: Value) -> i64 {
    let response = send(app, "POST", uri, Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    assert!(body_bytes(response).await.is_empty());
    location.rsplit('/').next().unwrap().parse().unwrap()
}
