//! Integration tests for health check endpoints
//!
//! Tests the health check API routes to ensure proper responses
//! for liveness and readiness probes.

mod common;

use axum::http::StatusCode;

use common::*;

#[tokio::test]
async fn test_simple_health_check() {
    let app = TestApp::new();

    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    let response = app.send(get("/health/live")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "alive");
    assert!(json["version"].is_string());
    assert_eq!(app.backend.call_count("auth.health"), 0);
}

#[tokio::test]
async fn test_readiness_with_healthy_backend() {
    let app = TestApp::new();

    let response = app.send(get("/health/ready")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["services"][0]["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_with_unreachable_backend() {
    let app = TestApp::new();
    app.backend.set_auth_unavailable();

    let response = app.send(get("/health/ready")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["status"], "unhealthy");
}
