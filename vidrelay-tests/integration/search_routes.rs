//! Metadata search through the full router against stubbed search and TMDB.

use axum::http::StatusCode;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures::{IMAGE_BASE, TMDB_KEY, Upstreams, fetch_json, keyed_tokens, relay};

const RESULTS_PAGE: &str = r#"
<table>
  <tr><td><a href="https://www.themoviedb.org/movie/27205-inception">Inception (2010)</a></td></tr>
  <tr><td><a href="https://www.themoviedb.org/tv/1399-game-of-thrones">Game of Thrones</a></td></tr>
</table>
"#;

async fn mount_search(server: &MockServer, page: &str) {
    Mock::given(method("GET"))
        .and(path("/lite/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(server)
        .await;
}

async fn mount_tmdb(server: &MockServer, endpoint: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/3/{endpoint}")))
        .and(query_param("api_key", TMDB_KEY))
        .respond_with(response)
        .mount(server)
        .await;
}

fn cast(count: usize) -> Value {
    let cast: Vec<Value> = (0..count)
        .map(|i| {
            let profile_path = (i == 0).then_some("/lead.jpg");
            json!({
                "name": format!("Actor {i}"),
                "character": format!("Role {i}"),
                "profile_path": profile_path,
            })
        })
        .collect();
    json!({ "id": 27205, "cast": cast })
}

fn backdrops(count: usize) -> Value {
    let backdrops: Vec<Value> = (0..count)
        .map(|i| json!({ "file_path": format!("/b{i}.jpg"), "width": 3840 }))
        .collect();
    json!({ "id": 27205, "backdrops": backdrops, "posters": [] })
}

fn inception_details() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": 27205,
        "title": "Inception",
        "overview": "Cobb steals secrets from the subconscious.",
        "poster_path": "/inception.jpg",
        "backdrop_path": "/dream.jpg"
    }))
}

#[tokio::test]
async fn test_search_shapes_and_truncates_metadata() {
    let upstreams = Upstreams::start().await;
    mount_search(&upstreams.metadata, RESULTS_PAGE).await;
    mount_tmdb(&upstreams.metadata, "movie/27205", inception_details()).await;
    mount_tmdb(
        &upstreams.metadata,
        "movie/27205/credits",
        ResponseTemplate::new(200).set_body_json(cast(15)),
    )
    .await;
    mount_tmdb(
        &upstreams.metadata,
        "movie/27205/images",
        ResponseTemplate::new(200).set_body_json(backdrops(8)),
    )
    .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/search/Inception").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contentId"], "27205");
    assert_eq!(body["kind"], "movie");
    assert_eq!(body["title"], "Inception");
    assert_eq!(body["poster"], format!("{IMAGE_BASE}/w500/inception.jpg"));
    assert_eq!(body["backdrop"], format!("{IMAGE_BASE}/original/dream.jpg"));

    let cast = body["cast"].as_array().cloned().unwrap_or_default();
    assert_eq!(cast.len(), 10);
    assert_eq!(cast[0]["name"], "Actor 0");
    assert_eq!(cast[0]["character"], "Role 0");
    assert_eq!(cast[0]["profilePhoto"], format!("{IMAGE_BASE}/w185/lead.jpg"));
    assert_eq!(cast[1]["profilePhoto"], Value::Null);

    let images = body["images"].as_array().cloned().unwrap_or_default();
    assert_eq!(images.len(), 5);
    assert_eq!(images[0], format!("{IMAGE_BASE}/original/b0.jpg"));
}

#[tokio::test]
async fn test_multi_word_query_is_normalized() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/lite/"))
        .and(query_param("q", "site:themoviedb.org The Dark Knight"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="https://www.themoviedb.org/movie/155">TDK</a>"#),
        )
        .expect(1)
        .mount(&upstreams.metadata)
        .await;
    mount_tmdb(&upstreams.metadata, "movie/155", inception_details()).await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/search/%20The%20%20Dark%20Knight").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contentId"], "155");
}

#[tokio::test]
async fn test_series_match_uses_tv_endpoints() {
    let upstreams = Upstreams::start().await;
    mount_search(
        &upstreams.metadata,
        r#"<a href="https://www.themoviedb.org/tv/1399-game-of-thrones">GoT</a>"#,
    )
    .await;
    mount_tmdb(
        &upstreams.metadata,
        "tv/1399",
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 1399,
            "name": "Game of Thrones",
            "overview": "Seven noble families fight for control.",
            "poster_path": null
        })),
    )
    .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/search/game%20of%20thrones").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "series");
    assert_eq!(body["title"], "Game of Thrones");
    assert_eq!(body["poster"], Value::Null);
    // Unmounted credits and images endpoints 404; both degrade to empty lists
    assert_eq!(body["cast"], json!([]));
    assert_eq!(body["images"], json!([]));
}

#[tokio::test]
async fn test_credits_failure_still_returns_result() {
    let upstreams = Upstreams::start().await;
    mount_search(&upstreams.metadata, RESULTS_PAGE).await;
    mount_tmdb(&upstreams.metadata, "movie/27205", inception_details()).await;
    mount_tmdb(
        &upstreams.metadata,
        "movie/27205/credits",
        ResponseTemplate::new(500),
    )
    .await;
    mount_tmdb(
        &upstreams.metadata,
        "movie/27205/images",
        ResponseTemplate::new(200).set_body_json(backdrops(2)),
    )
    .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/search/Inception").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cast"], json!([]));
    assert_eq!(body["images"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_no_match_is_internal_error() {
    let upstreams = Upstreams::start().await;
    mount_search(&upstreams.metadata, "<p>No results.</p>").await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/search/zzqxjv").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.contains("No TMDB result"), "{message}");
}

#[tokio::test]
async fn test_primary_metadata_failure_is_internal_error() {
    let upstreams = Upstreams::start().await;
    mount_search(&upstreams.metadata, RESULTS_PAGE).await;
    mount_tmdb(
        &upstreams.metadata,
        "movie/27205",
        ResponseTemplate::new(404).set_body_json(json!({ "status_code": 34 })),
    )
    .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/search/Inception").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.starts_with("Metadata fetch failed"), "{message}");
}

#[tokio::test]
async fn test_blank_query_is_rejected_without_search() {
    let upstreams = Upstreams::start().await;
    let (router, _) = relay(&upstreams, keyed_tokens());

    let (status, body) = fetch_json(&router, "/search/%20%09").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query");
    assert_eq!(upstreams.request_count().await, 0);
}
