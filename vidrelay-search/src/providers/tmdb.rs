//! TMDB (The Movie Database) v3 API client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use vidrelay_core::config::MetadataConfig;

use super::MetadataSource;
use crate::errors::MediaSearchError;
use crate::types::{ContentMatch, Credits, Images, TitleDetails};

/// TMDB metadata provider for details, credits and images.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TmdbClient {
    /// Create TMDB client from metadata configuration.
    pub fn new(config: &MetadataConfig) -> Self {
        Self::with_api_key(config.tmdb_base_url.clone(), config.tmdb_api_key.clone())
    }

    /// Create TMDB client with explicit base URL and API key.
    pub fn with_api_key(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Endpoint for a located entry, e.g. `/movie/27205/credits`.
    pub fn endpoint(&self, target: &ContentMatch, suffix: &str) -> String {
        format!(
            "{}/{}/{}{suffix}",
            self.base_url,
            target.kind.api_path(),
            target.id
        )
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        target: &ContentMatch,
        suffix: &str,
    ) -> Result<T, MediaSearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(MediaSearchError::MetadataFetchFailed {
                reason: "TMDB API key is not configured".to_string(),
            });
        };

        let url = self.endpoint(target, suffix);
        tracing::debug!("TMDB request {url}");

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", api_key)])
            .send()
            .await
            .map_err(|e| MediaSearchError::MetadataFetchFailed {
                reason: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaSearchError::MetadataFetchFailed {
                reason: format!("TMDB {status} for {}{suffix}", target.id),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MediaSearchError::MetadataFetchFailed {
                reason: format!("JSON parsing failed: {e}"),
            })
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    async fn details(&self, target: &ContentMatch) -> Result<TitleDetails, MediaSearchError> {
        self.fetch(target, "").await
    }

    async fn credits(&self, target: &ContentMatch) -> Result<Credits, MediaSearchError> {
        self.fetch(target, "/credits").await
    }

    async fn images(&self, target: &ContentMatch) -> Result<Images, MediaSearchError> {
        self.fetch(target, "/images").await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::types::ContentKind;

    fn inception() -> ContentMatch {
        ContentMatch {
            kind: ContentKind::Movie,
            id: "27205".to_string(),
        }
    }

    #[test]
    fn test_series_endpoints_use_tv_segment() {
        let client = TmdbClient::with_api_key("https://api.themoviedb.org/3/".to_string(), None);
        let target = ContentMatch {
            kind: ContentKind::Series,
            id: "1399".to_string(),
        };
        assert_eq!(
            client.endpoint(&target, "/images"),
            "https://api.themoviedb.org/3/tv/1399/images"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let server = MockServer::start().await;
        let client = TmdbClient::with_api_key(server.uri(), None);

        let err = client.details(&inception()).await.unwrap_err();

        assert!(matches!(err, MediaSearchError::MetadataFetchFailed { .. }));
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_details_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/27205"))
            .and(query_param("api_key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Inception",
                "overview": "Dreams within dreams",
                "poster_path": "/poster.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TmdbClient::with_api_key(server.uri(), Some("k".to_string()));
        let details = client.details(&inception()).await.unwrap();

        assert_eq!(details.display_title().as_deref(), Some("Inception"));
        assert_eq!(details.poster_path.as_deref(), Some("/poster.jpg"));
        assert_eq!(details.backdrop_path, None);
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status_code": 7,
                "status_message": "Invalid API key"
            })))
            .mount(&server)
            .await;

        let client = TmdbClient::with_api_key(server.uri(), Some("bad".to_string()));
        let err = client.credits(&inception()).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
