//! Health reporting and token module initialization through the router.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use vidrelay_core::token::StubTokenModule;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::fixtures::{Upstreams, fetch_json, relay};

#[tokio::test]
async fn test_health_reports_initialization_and_never_regresses() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/api/b/movie/tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&upstreams.provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/b/tv/tok/1/1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstreams.provider)
        .await;

    let module = Arc::new(StubTokenModule::with_token("tok").ready_after_probes(3));
    let (router, _) = relay(&upstreams, module.clone());

    let (status, body) = fetch_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "wasmInitialized": false }));
    assert_eq!(module.load_count(), 0);

    let (status, _) = fetch_json(&router, "/movie/550").await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = fetch_json(&router, "/health").await;
    assert_eq!(body["wasmInitialized"], true);

    // A failing request afterwards leaves the module initialized
    let (status, _) = fetch_json(&router, "/series/42/1/1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (_, body) = fetch_json(&router, "/health").await;
    assert_eq!(body["wasmInitialized"], true);
    assert_eq!(module.load_count(), 1);
}

#[tokio::test]
async fn test_concurrent_first_requests_load_module_once() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/api/b/movie/tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&upstreams.provider)
        .await;

    let module = Arc::new(
        StubTokenModule::with_token("tok").with_load_delay(Duration::from_millis(50)),
    );
    let (router, _) = relay(&upstreams, module.clone());

    let requests = (0..8).map(|i| {
        let router = router.clone();
        async move { fetch_json(&router, &format!("/movie/{i}")).await }
    });
    let responses = futures::future::join_all(requests).await;

    assert!(responses.iter().all(|(status, _)| *status == StatusCode::OK));
    assert_eq!(module.load_count(), 1);
    assert_eq!(module.derive_count(), 8);
}

#[tokio::test]
async fn test_failed_initialization_is_retried_by_next_request() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/api/b/movie/tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&upstreams.provider)
        .await;

    let module = Arc::new(StubTokenModule::with_token("tok").failing_loads(1));
    let (router, _) = relay(&upstreams, module.clone());

    let (status, _) = fetch_json(&router, "/movie/550").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (_, body) = fetch_json(&router, "/health").await;
    assert_eq!(body["wasmInitialized"], false);

    let (status, _) = fetch_json(&router, "/movie/550").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(module.load_count(), 2);
}
