//! Query to metadata resolution: search, primary lookup, then enrichment.

use std::sync::Arc;

use vidrelay_core::CallPolicy;
use vidrelay_core::config::MetadataConfig;

use crate::errors::MediaSearchError;
use crate::providers::duckduckgo::normalize_query;
use crate::providers::{ContentLocator, DuckDuckGoLocator, MetadataSource, TmdbClient};
use crate::types::{CastMember, ContentMatch, Credits, Images, SearchResult, TitleDetails};

/// Cast entries kept in a result.
pub const MAX_CAST: usize = 10;
/// Backdrop URLs kept in a result.
pub const MAX_IMAGES: usize = 5;

/// Resolves free-text queries into shaped metadata.
///
/// The title lookup is required. Credits and images are enrichments: a
/// failure in either leaves that list empty instead of failing the query.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    locator: Arc<dyn ContentLocator>,
    source: Arc<dyn MetadataSource>,
    image_base_url: String,
}

impl MetadataResolver {
    /// Create resolver from explicit providers.
    pub fn new(
        locator: Arc<dyn ContentLocator>,
        source: Arc<dyn MetadataSource>,
        image_base_url: impl Into<String>,
    ) -> Self {
        let image_base_url: String = image_base_url.into();
        Self {
            locator,
            source,
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create resolver backed by DuckDuckGo and TMDB.
    pub fn from_config(config: &MetadataConfig) -> Self {
        Self::new(
            Arc::new(DuckDuckGoLocator::new(config)),
            Arc::new(TmdbClient::new(config)),
            config.image_base_url.clone(),
        )
    }

    /// Resolve `query` into a [`SearchResult`].
    ///
    /// # Errors
    ///
    /// - `MediaSearchError::InvalidQuery` - Query is empty or only whitespace
    /// - `MediaSearchError::SearchFailed` - Search engine unreachable
    /// - `MediaSearchError::NoMatchFound` - No TMDB link in the search results
    /// - `MediaSearchError::MetadataFetchFailed` - Primary title lookup failed
    pub async fn resolve(&self, query: &str) -> Result<SearchResult, MediaSearchError> {
        let normalized = normalize_query(query).ok_or(MediaSearchError::InvalidQuery)?;
        let target = self.locator.locate(&normalized).await?;
        tracing::debug!("Query '{normalized}' located {} {}", target.kind, target.id);

        let details = CallPolicy::Required.settle(
            "title details",
            self.source.details(&target).await,
            TitleDetails::default,
        )?;

        let (credits, images) =
            tokio::join!(self.source.credits(&target), self.source.images(&target));
        let credits = CallPolicy::BestEffort.settle_or_default("credits", credits)?;
        let images = CallPolicy::BestEffort.settle_or_default("images", images)?;

        Ok(self.shape(target, details, credits, images))
    }

    fn shape(
        &self,
        target: ContentMatch,
        details: TitleDetails,
        credits: Credits,
        images: Images,
    ) -> SearchResult {
        let cast = credits
            .cast
            .into_iter()
            .take(MAX_CAST)
            .map(|entry| CastMember {
                profile_photo: self.image_url("w185", entry.profile_path.as_deref()),
                name: entry.name,
                character: entry.character,
            })
            .collect();

        let images = images
            .backdrops
            .iter()
            .filter_map(|image| self.image_url("original", image.file_path.as_deref()))
            .take(MAX_IMAGES)
            .collect();

        SearchResult {
            title: details.display_title(),
            overview: details.overview,
            poster: self.image_url("w500", details.poster_path.as_deref()),
            backdrop: self.image_url("original", details.backdrop_path.as_deref()),
            content_id: target.id,
            kind: target.kind,
            cast,
            images,
        }
    }

    /// `{base}/{size}{path}`, or `None` when TMDB gave no path.
    fn image_url(&self, size: &str, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}/{size}{p}", self.image_base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockLocator, MockMetadataSource};
    use crate::types::ContentKind;

    const IMG: &str = "https://image.tmdb.org/t/p";

    fn inception() -> ContentMatch {
        ContentMatch {
            kind: ContentKind::Movie,
            id: "27205".to_string(),
        }
    }

    fn resolver(source: MockMetadataSource) -> (MetadataResolver, Arc<MockMetadataSource>) {
        let source = Arc::new(source);
        let resolver = MetadataResolver::new(
            Arc::new(MockLocator::finding(inception())),
            source.clone(),
            IMG,
        );
        (resolver, source)
    }

    #[tokio::test]
    async fn test_resolve_truncates_cast_and_images() {
        let (resolver, _) = resolver(MockMetadataSource::new(25, 12));

        let result = resolver.resolve("Inception").await.unwrap();

        assert_eq!(result.cast.len(), MAX_CAST);
        assert_eq!(result.images.len(), MAX_IMAGES);
        assert_eq!(result.cast[0].name, "Actor 0");
        assert_eq!(result.cast[9].name, "Actor 9");
        assert_eq!(result.images[0], format!("{IMG}/original/backdrop0.jpg"));
    }

    #[tokio::test]
    async fn test_resolve_shapes_urls() {
        let (resolver, _) = resolver(MockMetadataSource::new(2, 1));

        let result = resolver.resolve("  Inception ").await.unwrap();

        assert_eq!(result.content_id, "27205");
        assert_eq!(result.kind, ContentKind::Movie);
        assert_eq!(result.title.as_deref(), Some("Inception"));
        assert_eq!(result.poster, Some(format!("{IMG}/w500/poster.jpg")));
        assert_eq!(result.backdrop, None);
        assert_eq!(
            result.cast[0].profile_photo,
            Some(format!("{IMG}/w185/actor0.jpg"))
        );
        assert_eq!(result.cast[1].profile_photo, None);
    }

    #[tokio::test]
    async fn test_credits_failure_leaves_cast_empty() {
        let (resolver, _) = resolver(MockMetadataSource {
            backdrop_count: 3,
            fail_credits: true,
            ..MockMetadataSource::default()
        });

        let result = resolver.resolve("Inception").await.unwrap();

        assert!(result.cast.is_empty());
        assert_eq!(result.images.len(), 3);
    }

    #[tokio::test]
    async fn test_images_failure_leaves_images_empty() {
        let (resolver, _) = resolver(MockMetadataSource {
            cast_size: 4,
            fail_images: true,
            ..MockMetadataSource::default()
        });

        let result = resolver.resolve("Inception").await.unwrap();

        assert!(result.images.is_empty());
        assert_eq!(result.cast.len(), 4);
    }

    #[tokio::test]
    async fn test_primary_failure_fails_whole_query() {
        let (resolver, source) = resolver(MockMetadataSource {
            cast_size: 4,
            fail_details: true,
            ..MockMetadataSource::default()
        });

        let err = resolver.resolve("Inception").await.unwrap_err();

        assert!(matches!(err, MediaSearchError::MetadataFetchFailed { .. }));
        // Enrichment lookups never start without the primary result
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_match_skips_metadata() {
        let source = Arc::new(MockMetadataSource::new(4, 4));
        let resolver = MetadataResolver::new(Arc::new(MockLocator::empty()), source.clone(), IMG);

        let err = resolver.resolve("zzqxj").await.unwrap_err();

        assert!(matches!(err, MediaSearchError::NoMatchFound { .. }));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_query_is_invalid() {
        let (resolver, source) = resolver(MockMetadataSource::default());

        let err = resolver.resolve(" \t ").await.unwrap_err();

        assert!(matches!(err, MediaSearchError::InvalidQuery));
        assert_eq!(source.call_count(), 0);
    }
}
