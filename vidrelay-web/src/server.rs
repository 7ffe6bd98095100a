//! JSON API server for Vidrelay
//!
//! Wires the stream fetcher, metadata resolver and token provider into an
//! axum router and serves it on the configured address.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vidrelay_core::config::RelayConfig;
use vidrelay_core::{StreamFetcher, TokenProvider};
use vidrelay_search::MetadataResolver;

use crate::handlers::{episode_stream, health, movie_stream, search_metadata};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Manifest relay
    pub streams: Arc<StreamFetcher>,
    /// Query to metadata lookup
    pub resolver: Arc<MetadataResolver>,
    /// Token module handle, shared with `streams`
    pub tokens: Arc<TokenProvider>,
}

impl AppState {
    /// Builds state whose token provider is the one `streams` derives with.
    pub fn new(streams: StreamFetcher, resolver: MetadataResolver) -> Self {
        let tokens = streams.tokens().clone();
        Self {
            streams: Arc::new(streams),
            resolver: Arc::new(resolver),
            tokens,
        }
    }

    /// Builds production state from configuration.
    ///
    /// # Errors
    ///
    /// - `StreamError::Network` - HTTP client could not be constructed
    pub fn from_config(config: &RelayConfig) -> Result<Self, vidrelay_core::StreamError> {
        let tokens = Arc::new(TokenProvider::from_config(&config.token));
        let streams = StreamFetcher::new(&config.provider, tokens)?;
        let resolver = MetadataResolver::from_config(&config.metadata);
        Ok(Self::new(streams, resolver))
    }
}

/// Routes for the relay API.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/movie/{movie_id}", get(movie_stream))
        .route("/series/{tmdb_id}/{season}/{episode}", get(episode_stream))
        .route("/search/{query}", get(search_metadata))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API until interrupted.
///
/// Token module initialization starts in the background once the listener is
/// bound; requests arriving earlier wait for it on their own.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - HTTP client cannot be built or the address cannot be bound
pub async fn run_server(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(&config)?;
    let tokens = state.tokens.clone();
    let app = build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Vidrelay listening on http://{addr}");

    tokio::spawn(async move {
        match tokens.ensure_ready().await {
            Ok(()) => tracing::info!("Token module initialized"),
            Err(e) => tracing::warn!("Token module initialization failed: {e}"),
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Vidrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;
    use vidrelay_core::config::{MetadataConfig, ProviderConfig};
    use vidrelay_core::token::{Readiness, StubTokenModule};

    use super::*;

    fn state_with(module: Arc<StubTokenModule>) -> AppState {
        let readiness = Readiness {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        };
        let tokens = Arc::new(TokenProvider::new(module, readiness));
        let provider = ProviderConfig {
            // Nothing listens here; validation failures must never reach it
            origin: "http://127.0.0.1:1".to_string(),
            ..ProviderConfig::default()
        };
        let streams = StreamFetcher::new(&provider, tokens).unwrap();
        let resolver = MetadataResolver::from_config(&MetadataConfig::default());
        AppState::new(streams, resolver)
    }

    async fn fetch_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_non_numeric_season_is_rejected_before_token_use() {
        let module = Arc::new(StubTokenModule::with_token("tok"));
        let router = build_router(state_with(module.clone()));

        let (status, body) = fetch_json(router, "/series/100/one/two").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid parameters");
        assert_eq!(module.load_count(), 0);
        assert_eq!(module.derive_count(), 0);
    }

    #[tokio::test]
    async fn test_negative_episode_is_rejected() {
        let module = Arc::new(StubTokenModule::with_token("tok"));
        let router = build_router(state_with(module.clone()));

        let (status, _) = fetch_json(router, "/series/100/1/-2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(module.derive_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_movie_id_is_rejected() {
        let module = Arc::new(StubTokenModule::with_token("tok"));
        let router = build_router(state_with(module.clone()));

        let (status, body) = fetch_json(router, "/movie/%20%20").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid movieId");
        assert_eq!(module.load_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_search_query_is_rejected() {
        let module = Arc::new(StubTokenModule::with_token("tok"));
        let router = build_router(state_with(module));

        let (status, body) = fetch_json(router, "/search/%20").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid query");
    }

    #[tokio::test]
    async fn test_health_does_not_initialize_module() {
        let module = Arc::new(StubTokenModule::with_token("tok"));
        let state = state_with(module.clone());
        let router = build_router(state.clone());

        let (status, body) = fetch_json(router.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["wasmInitialized"], false);
        assert_eq!(module.load_count(), 0);

        state.tokens.ensure_ready().await.unwrap();
        let (_, body) = fetch_json(router, "/health").await;
        assert_eq!(body["wasmInitialized"], true);
    }

    #[tokio::test]
    async fn test_token_failure_maps_to_internal_error() {
        let module = Arc::new(StubTokenModule::with_tokens(|_, _| None));
        let router = build_router(state_with(module.clone()));

        let (status, body) = fetch_json(router, "/movie/550").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap_or_default();
        assert!(message.starts_with("Token derivation failed"), "{message}");
        assert_eq!(module.derive_count(), 1);
    }
}
