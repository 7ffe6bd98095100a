//! Data types for metadata lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content classification as exposed by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Feature film
    Movie,
    /// TV series, `tv` on TMDB
    Series,
}

impl ContentKind {
    /// Path segment TMDB uses for this kind.
    pub fn api_path(self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Series => "tv",
        }
    }

    /// Parses a TMDB path segment (`movie` or `tv`, any case).
    pub fn from_api_path(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "movie" => Some(ContentKind::Movie),
            "tv" => Some(ContentKind::Series),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Movie => write!(f, "movie"),
            ContentKind::Series => write!(f, "series"),
        }
    }
}

/// A TMDB entry located by the search step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMatch {
    /// Movie or series
    pub kind: ContentKind,
    /// Numeric TMDB identifier
    pub id: String,
}

/// Metadata returned for a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// TMDB identifier
    pub content_id: String,
    /// Movie or series
    pub kind: ContentKind,
    /// Display title
    pub title: Option<String>,
    /// Plot summary
    pub overview: Option<String>,
    /// Poster URL at w500
    pub poster: Option<String>,
    /// Backdrop URL at original size
    pub backdrop: Option<String>,
    /// At most ten entries, billing order
    pub cast: Vec<CastMember>,
    /// At most five backdrop URLs
    pub images: Vec<String>,
}

/// One billed cast entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMember {
    /// Actor name
    pub name: String,
    /// Role played
    pub character: Option<String>,
    /// Profile photo URL at w185
    pub profile_photo: Option<String>,
}

/// `/{kind}/{id}` response fields the relay uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleDetails {
    /// Set for movies
    pub title: Option<String>,
    /// Set for series
    pub name: Option<String>,
    /// Plot summary
    pub overview: Option<String>,
    /// Poster path fragment
    pub poster_path: Option<String>,
    /// Backdrop path fragment
    pub backdrop_path: Option<String>,
}

impl TitleDetails {
    /// Display title, whichever field the kind carries.
    pub fn display_title(&self) -> Option<String> {
        self.title
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| self.name.clone())
    }
}

/// `/{kind}/{id}/credits` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    /// Cast in billing order
    #[serde(default)]
    pub cast: Vec<CreditEntry>,
}

/// One cast entry from TMDB credits.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditEntry {
    /// Actor name
    #[serde(default)]
    pub name: String,
    /// Role played
    pub character: Option<String>,
    /// Profile photo path fragment
    pub profile_path: Option<String>,
}

/// `/{kind}/{id}/images` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    /// Backdrops in TMDB order
    #[serde(default)]
    pub backdrops: Vec<ImageEntry>,
}

/// One image from TMDB images.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageEntry {
    /// Path fragment, e.g. `/abc.jpg`
    pub file_path: Option<String>,
}
