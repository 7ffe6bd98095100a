//! Site-scoped lookup through the DuckDuckGo lite HTML endpoint.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use vidrelay_core::config::MetadataConfig;

use super::ContentLocator;
use crate::errors::MediaSearchError;
use crate::types::{ContentKind, ContentMatch};

static TMDB_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)themoviedb\.org/(movie|tv)/(\d+)").expect("TMDB link pattern is valid")
});

/// Locates TMDB pages by searching `site:themoviedb.org`.
#[derive(Debug, Clone)]
pub struct DuckDuckGoLocator {
    client: reqwest::Client,
    search_url: String,
    user_agent: String,
}

impl DuckDuckGoLocator {
    /// Create locator for the configured search endpoint.
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            search_url: config.search_url.clone(),
            user_agent: config.search_user_agent.clone(),
        }
    }

    /// Full search URL for a normalized query.
    pub fn search_url_for(&self, normalized_query: &str) -> String {
        format!("{}?q=site:themoviedb.org+{normalized_query}", self.search_url)
    }
}

/// Collapses whitespace runs into `+` separators and percent-encodes each word.
///
/// Returns `None` when nothing but whitespace was given.
pub fn normalize_query(query: &str) -> Option<String> {
    let words: Vec<String> = query
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join("+"))
    }
}

/// First TMDB movie or series link in a result page. Later links are ignored.
pub fn extract_match(body: &str) -> Option<ContentMatch> {
    let captures = TMDB_LINK.captures(body)?;

    let kind = ContentKind::from_api_path(captures.get(1)?.as_str())?;
    let id = captures.get(2)?.as_str().to_string();
    Some(ContentMatch { kind, id })
}

#[async_trait]
impl ContentLocator for DuckDuckGoLocator {
    async fn locate(&self, normalized_query: &str) -> Result<ContentMatch, MediaSearchError> {
        let url = self.search_url_for(normalized_query);
        tracing::debug!("Searching {url}");

        let search_failed = |e: reqwest::Error| MediaSearchError::SearchFailed {
            query: normalized_query.to_string(),
            reason: e.to_string(),
        };

        let body = self
            .client
            .get(&url)
            .header("user-agent", self.user_agent.as_str())
            .send()
            .await
            .map_err(search_failed)?
            .text()
            .await
            .map_err(search_failed)?;

        extract_match(&body).ok_or_else(|| MediaSearchError::NoMatchFound {
            query: normalized_query.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(
            normalize_query("  The   Dark\tKnight ").as_deref(),
            Some("The+Dark+Knight")
        );
        assert_eq!(normalize_query("Inception").as_deref(), Some("Inception"));
    }

    #[test]
    fn test_normalize_encodes_reserved_characters() {
        assert_eq!(
            normalize_query("Tom & Jerry").as_deref(),
            Some("Tom+%26+Jerry")
        );
    }

    #[test]
    fn test_normalize_rejects_blank_query() {
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query(""), None);
    }

    #[test]
    fn test_first_match_wins() {
        let html = r#"
            <a href="https://www.themoviedb.org/tv/1399-game-of-thrones">GoT</a>
            <a href="https://www.themoviedb.org/movie/27205-inception">Inception</a>
        "#;
        assert_eq!(
            extract_match(html),
            Some(ContentMatch {
                kind: ContentKind::Series,
                id: "1399".to_string()
            })
        );
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let html = "www.TheMovieDB.org/Movie/27205";
        assert_eq!(
            extract_match(html),
            Some(ContentMatch {
                kind: ContentKind::Movie,
                id: "27205".to_string()
            })
        );
    }

    #[test]
    fn test_link_pattern_compiles() {
        assert_eq!(TMDB_LINK.captures_len(), 3);
    }

    #[test]
    fn test_non_title_links_do_not_match() {
        assert_eq!(extract_match("themoviedb.org/person/525-christopher-nolan"), None);
        assert_eq!(extract_match("<html>no results</html>"), None);
    }

    #[test]
    fn test_search_url_is_site_scoped() {
        let locator = DuckDuckGoLocator::new(&MetadataConfig::default());
        assert_eq!(
            locator.search_url_for("Inception"),
            "https://lite.duckduckgo.com/lite/?q=site:themoviedb.org+Inception"
        );
    }
}
