//! Manifest relaying from the streaming provider.
//!
//! Each fetch is a strict chain: token derivation, manifest request, and an
//! optional playlist request. The manifest is required; the playlist is an
//! enrichment fetched under [`CallPolicy::BestEffort`].

pub mod result;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use result::StreamResult;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::ProviderConfig;
use crate::content::ContentRef;
use crate::policy::CallPolicy;
use crate::token::{TokenError, TokenProvider};

/// Errors that abort a stream fetch.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// No usable token could be obtained; no manifest request was made.
    #[error("Token derivation failed: {0}")]
    TokenDerivationFailed(#[from] TokenError),

    /// The provider answered with a non-success status.
    #[error("API status {status}")]
    UpstreamError {
        /// HTTP status code returned
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// The request never produced a response.
    #[error("Network error: {reason}")]
    Network {
        /// Transport failure description
        reason: String,
    },

    /// The manifest body was not a JSON object.
    #[error("Invalid manifest: {reason}")]
    InvalidManifest {
        /// What was wrong with the body
        reason: String,
    },
}

/// Fetches manifests for movies and episodes.
#[derive(Debug, Clone)]
pub struct StreamFetcher {
    client: reqwest::Client,
    tokens: Arc<TokenProvider>,
    origin: String,
    user_agent: String,
}

impl StreamFetcher {
    /// Creates a fetcher for the configured provider.
    ///
    /// # Errors
    ///
    /// - `StreamError::Network` - HTTP client could not be constructed
    pub fn new(config: &ProviderConfig, tokens: Arc<TokenProvider>) -> Result<Self, StreamError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| StreamError::Network {
            reason: format!("HTTP client setup failed: {e}"),
        })?;

        Ok(Self {
            client,
            tokens,
            origin: config.origin.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }

    /// Token provider this fetcher derives tokens from.
    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Fetches the manifest for a movie.
    ///
    /// # Errors
    ///
    /// - `StreamError::TokenDerivationFailed` - Token module not ready or returned nothing
    /// - `StreamError::UpstreamError` - Manifest request returned non-2xx
    /// - `StreamError::Network` - Manifest request failed in transport
    /// - `StreamError::InvalidManifest` - Manifest body was not a JSON object
    pub async fn fetch_movie_stream(&self, movie_id: &str) -> Result<StreamResult, StreamError> {
        self.fetch(&ContentRef::movie(movie_id)).await
    }

    /// Fetches the manifest for one episode of a series.
    ///
    /// # Errors
    ///
    /// - `StreamError::TokenDerivationFailed` - Token module not ready or returned nothing
    /// - `StreamError::UpstreamError` - Manifest request returned non-2xx
    /// - `StreamError::Network` - Manifest request failed in transport
    /// - `StreamError::InvalidManifest` - Manifest body was not a JSON object
    pub async fn fetch_episode_stream(
        &self,
        series_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<StreamResult, StreamError> {
        self.fetch(&ContentRef::episode(series_id, season, episode))
            .await
    }

    /// Runs the token → manifest → playlist chain for any content.
    ///
    /// # Errors
    ///
    /// - `StreamError::TokenDerivationFailed` - Token module not ready or returned nothing
    /// - `StreamError::UpstreamError` - Manifest request returned non-2xx
    /// - `StreamError::Network` - Manifest request failed in transport
    /// - `StreamError::InvalidManifest` - Manifest body was not a JSON object
    pub async fn fetch(&self, content: &ContentRef) -> Result<StreamResult, StreamError> {
        self.tokens.ensure_ready().await?;
        let context = content.page_context(&self.origin);
        let token = self
            .tokens
            .derive_token(content.token_key(), &context)
            .await?;

        let api_url = content.manifest_url(&self.origin, &token);
        let headers = self.request_headers(content);

        info!("Fetching manifest for {content}");
        debug!("Manifest URL: {api_url}");

        let response = self
            .get(&api_url, &headers)
            .send()
            .await
            .map_err(|e| StreamError::Network {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::UpstreamError {
                status: status.as_u16(),
                url: api_url,
            });
        }

        let manifest: Value = response
            .json()
            .await
            .map_err(|e| StreamError::InvalidManifest {
                reason: e.to_string(),
            })?;
        let Value::Object(payload) = manifest else {
            return Err(StreamError::InvalidManifest {
                reason: "expected a JSON object".to_string(),
            });
        };

        let playlist = match StreamResult::playlist_reference(&payload) {
            Some(reference) => {
                let fetched = self.fetch_playlist(&api_url, reference, &headers).await;
                CallPolicy::BestEffort.settle("Playlist fetch", fetched.map(Some), || None)?
            }
            None => None,
        };

        Ok(StreamResult {
            api_url,
            headers,
            playlist,
            payload,
        })
    }

    async fn fetch_playlist(
        &self,
        api_url: &str,
        reference: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, StreamError> {
        let url = Url::parse(api_url)
            .and_then(|base| base.join(reference))
            .map_err(|e| StreamError::InvalidManifest {
                reason: format!("unusable playlist reference {reference:?}: {e}"),
            })?;

        debug!("Fetching playlist {url}");
        let response = self
            .get(url.as_str(), headers)
            .send()
            .await
            .map_err(|e| StreamError::Network {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::UpstreamError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| StreamError::Network {
            reason: e.to_string(),
        })
    }

    /// Fixed header set presented to the provider for this content.
    pub fn request_headers(&self, content: &ContentRef) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("referer".to_string(), content.referer(&self.origin)),
            ("user-agent".to_string(), self.user_agent.clone()),
            ("accept".to_string(), "*/*".to_string()),
            ("origin".to_string(), self.origin.clone()),
        ])
    }

    fn get(&self, url: &str, headers: &BTreeMap<String, String>) -> reqwest::RequestBuilder {
        headers
            .iter()
            .fold(self.client.get(url), |request, (name, value)| {
                request.header(name.as_str(), value.as_str())
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::token::{Readiness, StubTokenModule};

    fn readiness() -> Readiness {
        Readiness {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn fetcher_for(server: &MockServer, module: Arc<StubTokenModule>) -> StreamFetcher {
        let config = ProviderConfig {
            origin: server.uri(),
            ..ProviderConfig::default()
        };
        let tokens = Arc::new(TokenProvider::new(module, readiness()));
        StreamFetcher::new(&config, tokens).unwrap()
    }

    fn keyed_tokens() -> Arc<StubTokenModule> {
        Arc::new(StubTokenModule::with_tokens(|key, _| {
            Some(format!("tok-{key}"))
        }))
    }

    #[tokio::test]
    async fn test_movie_manifest_uses_derived_token() {
        let server = MockServer::start().await;
        let referer = format!("{}/movie/550", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/b/movie/tok-550"))
            .and(query_param("multiLang", "0"))
            .and(header("referer", referer.as_str()))
            .and(header("origin", server.uri().as_str()))
            .and(header("accept", "*/*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sourceId": "primary",
                "stream": {"id": "s1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, keyed_tokens());
        let result = fetcher.fetch_movie_stream("550").await.unwrap();

        assert!(result.api_url.contains("/api/b/movie/tok-550"));
        assert_eq!(result.playlist, None);
        assert_eq!(result.payload["sourceId"], "primary");
        assert_eq!(result.headers["referer"], referer);
    }

    #[tokio::test]
    async fn test_episode_manifest_path_and_referer() {
        let server = MockServer::start().await;
        let referer = format!("{}/tv/1399/2/5", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/b/tv/tok-1399/2/5"))
            .and(header("referer", referer.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stream": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let module = keyed_tokens();
        let fetcher = fetcher_for(&server, module.clone());
        fetcher.fetch_episode_stream("1399", 2, 5).await.unwrap();

        let contexts = module.seen_contexts();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].path, "/tv/1399");
    }

    #[tokio::test]
    async fn test_empty_token_makes_no_manifest_call() {
        let server = MockServer::start().await;
        let fetcher = fetcher_for(&server, Arc::new(StubTokenModule::with_tokens(|_, _| None)));

        let err = fetcher.fetch_movie_stream("550").await.unwrap_err();

        assert!(matches!(
            err,
            StreamError::TokenDerivationFailed(TokenError::EmptyToken)
        ));
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_manifest_non_success_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, keyed_tokens());
        let err = fetcher.fetch_movie_stream("550").await.unwrap_err();

        assert!(matches!(err, StreamError::UpstreamError { status: 403, .. }));
        assert_eq!(err.to_string(), "API status 403");
    }

    #[tokio::test]
    async fn test_playlist_is_fetched_with_same_headers() {
        let server = MockServer::start().await;
        let referer = format!("{}/movie/550", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/b/movie/tok-550"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stream": {"playlist": "/hls/master.m3u8"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hls/master.m3u8"))
            .and(header("referer", referer.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, keyed_tokens());
        let result = fetcher.fetch_movie_stream("550").await.unwrap();

        assert_eq!(result.playlist.as_deref(), Some("#EXTM3U\n"));
    }

    #[tokio::test]
    async fn test_playlist_failure_degrades_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/b/movie/tok-550"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stream": {"playlist": "http://127.0.0.1:1/unreachable.m3u8"}
            })))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, keyed_tokens());
        let result = fetcher.fetch_movie_stream("550").await.unwrap();

        assert_eq!(result.playlist, None);
        assert_eq!(
            result.payload["stream"]["playlist"],
            "http://127.0.0.1:1/unreachable.m3u8"
        );
    }

    #[tokio::test]
    async fn test_non_object_manifest_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "an", "object"])))
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&server, keyed_tokens());
        let err = fetcher.fetch_movie_stream("550").await.unwrap_err();
        assert!(matches!(err, StreamError::InvalidManifest { .. }));
    }
}
