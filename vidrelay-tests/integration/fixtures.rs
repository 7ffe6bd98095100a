//! Shared setup for router-level tests: stub token module, wiremock upstreams.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use vidrelay_core::config::{MetadataConfig, ProviderConfig};
use vidrelay_core::token::{Readiness, StubTokenModule};
use vidrelay_core::{StreamFetcher, TokenProvider};
use vidrelay_search::MetadataResolver;
use vidrelay_web::{AppState, build_router};
use wiremock::MockServer;

pub const TMDB_KEY: &str = "test-key";
pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

/// Stand-ins for the streaming provider and the search/TMDB side.
pub struct Upstreams {
    pub provider: MockServer,
    pub metadata: MockServer,
}

impl Upstreams {
    pub async fn start() -> Self {
        Self {
            provider: MockServer::start().await,
            metadata: MockServer::start().await,
        }
    }

    /// Requests either upstream has seen.
    pub async fn request_count(&self) -> usize {
        let provider = self.provider.received_requests().await.unwrap_or_default();
        let metadata = self.metadata.received_requests().await.unwrap_or_default();
        provider.len() + metadata.len()
    }
}

pub fn readiness() -> Readiness {
    Readiness {
        timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(5),
    }
}

pub fn relay(upstreams: &Upstreams, module: Arc<StubTokenModule>) -> (Router, AppState) {
    let tokens = Arc::new(TokenProvider::new(module, readiness()));
    let provider = ProviderConfig {
        origin: upstreams.provider.uri(),
        ..ProviderConfig::default()
    };
    let metadata = MetadataConfig {
        tmdb_api_key: Some(TMDB_KEY.to_string()),
        tmdb_base_url: format!("{}/3", upstreams.metadata.uri()),
        image_base_url: IMAGE_BASE.to_string(),
        search_url: format!("{}/lite/", upstreams.metadata.uri()),
        ..MetadataConfig::default()
    };

    let streams = StreamFetcher::new(&provider, tokens).unwrap();
    let state = AppState::new(streams, MetadataResolver::from_config(&metadata));
    (build_router(state.clone()), state)
}

pub async fn fetch_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Module whose token is `tok{key}`, so each request's URL shows which key it used.
pub fn keyed_tokens() -> Arc<StubTokenModule> {
    Arc::new(StubTokenModule::with_tokens(|key, _| Some(format!("tok{key}"))))
}
