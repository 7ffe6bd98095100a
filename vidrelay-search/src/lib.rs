//! Vidrelay Search - Metadata lookup for free-text queries

#![deny(missing_docs)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Locates a TMDB entry through a site-scoped web search, then fetches its
//! details, credits and images and shapes them into a single result.

pub mod errors;
pub mod metadata;
pub mod providers;
pub mod types;

// Re-export main types
pub use errors::MediaSearchError;
pub use metadata::{MAX_CAST, MAX_IMAGES, MetadataResolver};
pub use providers::{ContentLocator, DuckDuckGoLocator, MetadataSource, TmdbClient};
pub use types::{CastMember, ContentKind, ContentMatch, SearchResult};
