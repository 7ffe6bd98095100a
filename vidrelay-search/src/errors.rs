//! Error types for metadata lookup.

use thiserror::Error;

/// Errors that can occur while resolving a query to metadata.
#[derive(Debug, Error)]
pub enum MediaSearchError {
    /// Query was empty after normalization.
    #[error("Invalid query")]
    InvalidQuery,

    /// The search engine could not be reached.
    #[error("Search failed for query '{query}': {reason}")]
    SearchFailed {
        /// The normalized search query
        query: String,
        /// The reason for the failure
        reason: String,
    },

    /// No TMDB page link appeared in the search results.
    #[error("No TMDB result found for query '{query}'")]
    NoMatchFound {
        /// The normalized search query
        query: String,
    },

    /// Primary TMDB metadata could not be fetched or parsed.
    #[error("Metadata fetch failed: {reason}")]
    MetadataFetchFailed {
        /// The reason for the metadata fetch failure
        reason: String,
    },
}
