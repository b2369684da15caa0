//! Health Check API Tests

use axum::http::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_store_and_listeners() {
    let app = TestApp::new();
    let _listener = app.state.registry.register(Uuid::new_v4(), Uuid::new_v4());

    let response = app.server.get("/health/ready").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["store"]["status"], "healthy");
    assert!(body["checks"].get("redis").is_none());
    assert_eq!(body["checks"]["delivery"]["active_listeners"], 1);
    assert_eq!(body["checks"]["delivery"]["active_chats"], 1);
    assert_eq!(body["checks"]["delivery"]["writes_in_flight"], 0);
}

#[tokio::test]
async fn test_readiness_fails_during_store_outage() {
    let app = TestApp::new();
    app.store.set_down(true);

    let response = app.server.get("/health/ready").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["checks"]["store"]["status"], "unhealthy");

    // Liveness does not depend on the store
    app.server.get("/health/live").await.assert_status_ok();
}

#[tokio::test]
async fn test_metrics_exposition() {
    let app = TestApp::new();
    app.server.get("/health").await.assert_status_ok();

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("chat_delivery_http_requests_total"));
}
