//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use games_api::shutdown::ShutdownSignal;
use games_api::state::AppState;
use games_catalog::application::read_store::InMemoryGameReadStore;
use games_core::clock::Clock;
use games_test_support::{FixedClock, InMemoryEventRepository, RecordingEventPublisher};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// The pieces behind a test app, kept for inspection.
pub struct TestApp {
    pub router: Router,
    pub events: Arc<InMemoryEventRepository>,
    pub publisher: Arc<RecordingEventPublisher>,
    pub read_store: Arc<InMemoryGameReadStore>,
}

/// Build the full app (middleware included) over in-memory stores.
pub fn build_test_app() -> TestApp {
    let events = Arc::new(InMemoryEventRepository::new());
    let publisher = Arc::new(RecordingEventPublisher::new());
    let read_store = Arc::new(InMemoryGameReadStore::new());
    let state = AppState::new(
        fixed_clock(),
        events.clone(),
        publisher.clone(),
        read_store.clone(),
        ShutdownSignal::new(),
    );
    TestApp {
        router: games_api::app(state),
        events,
        publisher,
        read_store,
    }
}

/// Send a request and return status, headers and the JSON body.
pub async fn send(
    app: &Router,
    request: Request<Body>,
) -> (StatusCode, HeaderMap, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, json)
}

/// Build a JSON request.
pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Build a request without a body.
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
