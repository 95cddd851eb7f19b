//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chronicle_core::handle::RepositoryHandle;
use chronicle_core::memory::InMemoryStorage;
use chronicle_core::storage::StorageStrategy;
use chronicle_store::pg_storage::PgStorage;
use chronicle_test_support::FixedClock;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use chronicle_api::build_router;
use chronicle_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router over `storage` with a deterministic clock.
pub fn build_test_app_with(storage: Arc<dyn StorageStrategy>) -> Router {
    let handle = RepositoryHandle::with_clock(storage, fixed_clock());
    build_router(AppState::new(handle))
}

/// Build the full app router over a fresh in-memory storage.
pub fn build_test_app() -> Router {
    build_test_app_with(Arc::new(InMemoryStorage::new()))
}

/// Build the full app router over a real `PgStorage`.
pub fn build_pg_test_app(pool: PgPool) -> Router {
    build_test_app_with(Arc::new(PgStorage::new(pool)))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Names of the events in a `{events}` response body, in order.
pub fn event_names(json: &serde_json::Value) -> Vec<String> {
    json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["name"].as_str().unwrap().to_owned())
        .collect()
}
