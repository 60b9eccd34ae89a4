//! Integration tests for the optimizer API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use cost_optimizer::api::{create_router, AppState};
use optimizer_lib::{
    health::{components, HealthRegistry},
    observability::PipelineMetrics,
};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::with_default_components().await;
    let metrics = PipelineMetrics::new();
    let state = Arc::new(AppState::new(health_registry, metrics));
    let router = create_router(state.clone());

    (router, state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_degraded(components::PIPELINE, "Optional stages failed: assess_risk")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(
        health["components"]["pipeline"]["message"],
        "Optional stages failed: assess_risk"
    );
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_unhealthy(components::DATA_SOURCE, "inventory.json not found")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_returns_503_before_first_run() {
    let (app, _state) = setup_test_app().await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app().await;

    state.health_registry.set_ready(true).await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_readyz_returns_503_when_ready_but_unhealthy() {
    let (app, state) = setup_test_app().await;

    state.health_registry.set_ready(true).await;
    state
        .health_registry
        .set_unhealthy(components::PIPELINE, "Data ingestion failed")
        .await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(readiness["reason"].as_str().unwrap().contains("pipeline"));
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app().await;

    state.metrics.observe_stage("ingest", 0.01);
    state.metrics.inc_run("success");
    state.metrics.set_recommendations(4, 3, 250.0);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("cost_optimizer_stage_duration_seconds_bucket"));
    assert!(metrics_text.contains("cost_optimizer_runs_total"));
    assert!(metrics_text.contains("cost_optimizer_potential_monthly_savings"));
}

#[tokio::test]
async fn test_healthz_includes_component_details() {
    let (app, _state) = setup_test_app().await;

    let (_, health) = get_json(app, "/healthz").await;

    assert!(health["components"].is_object());
    for name in [
        components::DATA_SOURCE,
        components::PIPELINE,
        components::PERSISTENCE,
    ] {
        assert!(health["components"][name].is_object(), "missing {}", name);
    }
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _state) = setup_test_app().await;

    let (status, _) = get(app, "/recommendations").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
