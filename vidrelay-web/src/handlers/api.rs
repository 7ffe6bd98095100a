//! API handlers for stream relaying and metadata search

use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::{Value, json};
use vidrelay_search::SearchResult;

use crate::error::ApiError;
use crate::server::AppState;

/// Parses a season or episode number. Only plain ASCII digits are accepted.
pub fn parse_index(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// `GET /movie/{movie_id}`
///
/// # Errors
///
/// - `ApiError::InvalidParameters` - Blank movie id
/// - `ApiError::Internal` - Token derivation or manifest fetch failed
pub async fn movie_stream(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let movie_id = movie_id.trim();
    if movie_id.is_empty() {
        return Err(ApiError::InvalidParameters("Invalid movieId".to_string()));
    }

    let result = state.streams.fetch_movie_stream(movie_id).await?;
    Ok(Json(result.into_body([("movieId", json!(movie_id))])))
}

/// `GET /series/{tmdb_id}/{season}/{episode}`
///
/// # Errors
///
/// - `ApiError::InvalidParameters` - Blank id, or season/episode not a non-negative integer
/// - `ApiError::Internal` - Token derivation or manifest fetch failed
pub async fn episode_stream(
    State(state): State<AppState>,
    Path((tmdb_id, season, episode)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let tmdb_id = tmdb_id.trim();
    let (Some(season), Some(episode)) = (parse_index(&season), parse_index(&episode)) else {
        return Err(ApiError::InvalidParameters("Invalid parameters".to_string()));
    };
    if tmdb_id.is_empty() {
        return Err(ApiError::InvalidParameters("Invalid parameters".to_string()));
    }

    let result = state
        .streams
        .fetch_episode_stream(tmdb_id, season, episode)
        .await?;
    Ok(Json(result.into_body([
        ("tmdbId", json!(tmdb_id)),
        ("season", json!(season)),
        ("episode", json!(episode)),
    ])))
}

/// `GET /search/{query}`
///
/// # Errors
///
/// - `ApiError::InvalidParameters` - Blank query
/// - `ApiError::Internal` - Search, no match, or primary metadata lookup failed
pub async fn search_metadata(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<SearchResult>, ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::InvalidParameters("Invalid query".to_string()));
    }

    let result = state.resolver.resolve(&query).await?;
    Ok(Json(result))
}
