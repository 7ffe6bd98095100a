//! Content coordinates and the page context derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a stream request is for.
///
/// Constructed per request after validation; never partially filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRef {
    /// A feature film keyed by its TMDB id.
    Movie { id: String },
    /// A single episode of a series.
    Episode {
        series_id: String,
        season: u32,
        episode: u32,
    },
}

impl ContentRef {
    /// Creates a movie reference.
    pub fn movie(id: impl Into<String>) -> Self {
        Self::Movie { id: id.into() }
    }

    /// Creates an episode reference.
    pub fn episode(series_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self::Episode {
            series_id: series_id.into(),
            season,
            episode,
        }
    }

    /// Identifier handed to the token module as the derivation key.
    pub fn token_key(&self) -> &str {
        match self {
            Self::Movie { id } => id,
            Self::Episode { series_id, .. } => series_id,
        }
    }

    /// Provider page path the content lives under.
    pub fn page_path(&self) -> String {
        match self {
            Self::Movie { id } => format!("/movie/{id}"),
            Self::Episode { series_id, .. } => format!("/tv/{series_id}"),
        }
    }

    /// Provider page a browser would be on when playing this content.
    pub fn referer(&self, origin: &str) -> String {
        match self {
            Self::Movie { id } => format!("{origin}/movie/{id}"),
            Self::Episode {
                series_id,
                season,
                episode,
            } => format!("{origin}/tv/{series_id}/{season}/{episode}"),
        }
    }

    /// Manifest endpoint for a derived token.
    pub fn manifest_url(&self, origin: &str, token: &str) -> String {
        match self {
            Self::Movie { .. } => format!("{origin}/api/b/movie/{token}?multiLang=0"),
            Self::Episode {
                season, episode, ..
            } => format!("{origin}/api/b/tv/{token}/{season}/{episode}?multiLang=0"),
        }
    }

    /// Builds the page context the token module sees for this content.
    pub fn page_context(&self, origin: &str) -> PageContext {
        let path = self.page_path();
        PageContext {
            href: format!("{origin}{path}"),
            path,
            origin: origin.to_string(),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie { id } => write!(f, "movie {id}"),
            Self::Episode {
                series_id,
                season,
                episode,
            } => write!(f, "series {series_id} S{season}E{episode}"),
        }
    }
}

/// Browser-like location data the token module derives tokens against.
///
/// Request-scoped: passed by reference to each derivation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub href: String,
    pub path: String,
    pub origin: String,
}
