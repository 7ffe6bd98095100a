//! Mock provider implementations for testing.

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(test)]
use async_trait::async_trait;

#[cfg(test)]
use super::{ContentLocator, MetadataSource};
#[cfg(test)]
use crate::errors::MediaSearchError;
#[cfg(test)]
use crate::types::{ContentMatch, CreditEntry, Credits, ImageEntry, Images, TitleDetails};

/// Locator that always resolves to the same entry, or never matches.
#[cfg(test)]
#[derive(Debug)]
pub struct MockLocator {
    found: Option<ContentMatch>,
}

#[cfg(test)]
impl MockLocator {
    /// Creates a locator that finds `found`.
    pub fn finding(found: ContentMatch) -> Self {
        Self { found: Some(found) }
    }

    /// Creates a locator with no match for anything.
    pub fn empty() -> Self {
        Self { found: None }
    }
}

#[cfg(test)]
#[async_trait]
impl ContentLocator for MockLocator {
    async fn locate(&self, normalized_query: &str) -> Result<ContentMatch, MediaSearchError> {
        self.found
            .clone()
            .ok_or_else(|| MediaSearchError::NoMatchFound {
                query: normalized_query.to_string(),
            })
    }
}

/// Metadata source with a configurable cast size, backdrop count and failures.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockMetadataSource {
    /// Cast entries returned by `credits`
    pub cast_size: usize,
    /// Backdrops returned by `images`
    pub backdrop_count: usize,
    /// Fail the primary lookup
    pub fail_details: bool,
    /// Fail the credits lookup
    pub fail_credits: bool,
    /// Fail the images lookup
    pub fail_images: bool,
    /// Lookups made so far
    pub calls: AtomicUsize,
}

#[cfg(test)]
impl MockMetadataSource {
    /// Creates a source returning `cast_size` cast and `backdrop_count` backdrops.
    pub fn new(cast_size: usize, backdrop_count: usize) -> Self {
        Self {
            cast_size,
            backdrop_count,
            ..Self::default()
        }
    }

    /// Total lookups made against this source.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn failure(what: &str) -> MediaSearchError {
        MediaSearchError::MetadataFetchFailed {
            reason: format!("mock {what} failure"),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl MetadataSource for MockMetadataSource {
    async fn details(&self, _target: &ContentMatch) -> Result<TitleDetails, MediaSearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_details {
            return Err(Self::failure("details"));
        }
        Ok(TitleDetails {
            title: Some("Inception".to_string()),
            name: None,
            overview: Some("A thief who steals corporate secrets".to_string()),
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: None,
        })
    }

    async fn credits(&self, _target: &ContentMatch) -> Result<Credits, MediaSearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_credits {
            return Err(Self::failure("credits"));
        }
        let cast = (0..self.cast_size)
            .map(|i| CreditEntry {
                name: format!("Actor {i}"),
                character: Some(format!("Role {i}")),
                // Every other actor has a photo
                profile_path: (i % 2 == 0).then(|| format!("/actor{i}.jpg")),
            })
            .collect();
        Ok(Credits { cast })
    }

    async fn images(&self, _target: &ContentMatch) -> Result<Images, MediaSearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_images {
            return Err(Self::failure("images"));
        }
        let backdrops = (0..self.backdrop_count)
            .map(|i| ImageEntry {
                file_path: Some(format!("/backdrop{i}.jpg")),
            })
            .collect();
        Ok(Images { backdrops })
    }
}
