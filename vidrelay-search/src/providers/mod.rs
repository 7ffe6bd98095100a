//! Provider implementations for the search and metadata steps.

use async_trait::async_trait;

use crate::errors::MediaSearchError;
use crate::types::{ContentMatch, Credits, Images, TitleDetails};

pub mod duckduckgo;
pub mod mock;
pub mod tmdb;

pub use duckduckgo::DuckDuckGoLocator;
#[cfg(test)]
pub use mock::{MockLocator, MockMetadataSource};
pub use tmdb::TmdbClient;

/// Finds the TMDB entry a free-text query refers to.
#[async_trait]
pub trait ContentLocator: Send + Sync + std::fmt::Debug {
    /// Locates the first TMDB entry matching an already normalized query.
    ///
    /// # Errors
    ///
    /// - `MediaSearchError::SearchFailed` - Search engine unreachable
    /// - `MediaSearchError::NoMatchFound` - No TMDB link in the results
    async fn locate(&self, normalized_query: &str) -> Result<ContentMatch, MediaSearchError>;
}

/// TMDB-shaped metadata lookups for a located entry.
#[async_trait]
pub trait MetadataSource: Send + Sync + std::fmt::Debug {
    /// Primary title details.
    ///
    /// # Errors
    ///
    /// - `MediaSearchError::MetadataFetchFailed` - Request failed, non-2xx, or malformed body
    async fn details(&self, target: &ContentMatch) -> Result<TitleDetails, MediaSearchError>;

    /// Billed cast.
    ///
    /// # Errors
    ///
    /// - `MediaSearchError::MetadataFetchFailed` - Request failed, non-2xx, or malformed body
    async fn credits(&self, target: &ContentMatch) -> Result<Credits, MediaSearchError>;

    /// Backdrop images.
    ///
    /// # Errors
    ///
    /// - `MediaSearchError::MetadataFetchFailed` - Request failed, non-2xx, or malformed body
    async fn images(&self, target: &ContentMatch) -> Result<Images, MediaSearchError>;
}
