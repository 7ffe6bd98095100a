//! Movie and episode relaying through the full router.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use vidrelay_core::PageContext;
use vidrelay_core::token::StubTokenModule;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::fixtures::{Upstreams, fetch_json, keyed_tokens, relay};

#[tokio::test]
async fn test_movie_manifest_relayed_with_playlist() {
    let upstreams = Upstreams::start().await;
    let origin = upstreams.provider.uri();

    Mock::given(method("GET"))
        .and(path("/api/b/movie/tok550"))
        .and(query_param("multiLang", "0"))
        .and(header("referer", format!("{origin}/movie/550").as_str()))
        .and(header("origin", origin.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sourceId": "primary",
            "stream": { "playlist": "/hls/550/master.m3u8" }
        })))
        .expect(1)
        .mount(&upstreams.provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/550/master.m3u8"))
        .and(header("referer", format!("{origin}/movie/550").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n#EXT-X-VERSION:3\n"))
        .expect(1)
        .mount(&upstreams.provider)
        .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/movie/550").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movieId"], "550");
    assert_eq!(
        body["api_url"],
        format!("{origin}/api/b/movie/tok550?multiLang=0")
    );
    assert_eq!(body["headers"]["referer"], format!("{origin}/movie/550"));
    assert_eq!(body["headers"]["accept"], "*/*");
    assert_eq!(body["playlist"], "#EXTM3U\n#EXT-X-VERSION:3\n");
    assert_eq!(body["sourceId"], "primary");
}

#[tokio::test]
async fn test_episode_manifest_carries_identifiers() {
    let upstreams = Upstreams::start().await;
    let origin = upstreams.provider.uri();

    Mock::given(method("GET"))
        .and(path("/api/b/tv/tok1399/1/5"))
        .and(header("referer", format!("{origin}/tv/1399/1/5").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stream": {} })))
        .expect(1)
        .mount(&upstreams.provider)
        .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/series/1399/1/5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tmdbId"], "1399");
    assert_eq!(body["season"], 1);
    assert_eq!(body["episode"], 5);
    assert_eq!(body["playlist"], serde_json::Value::Null);
    assert_eq!(
        body["api_url"],
        format!("{origin}/api/b/tv/tok1399/1/5?multiLang=0")
    );
}

#[tokio::test]
async fn test_invalid_episode_numbers_make_no_calls() {
    let upstreams = Upstreams::start().await;
    let module = keyed_tokens();
    let (router, _) = relay(&upstreams, module.clone());

    for uri in ["/series/100/one/two", "/series/100/-1/2", "/series/100/1/2.5"] {
        let (status, body) = fetch_json(&router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "Invalid parameters");
    }

    assert_eq!(upstreams.request_count().await, 0);
    assert_eq!(module.load_count(), 0);
    assert_eq!(module.derive_count(), 0);
}

#[tokio::test]
async fn test_empty_token_never_reaches_provider() {
    let upstreams = Upstreams::start().await;
    let module = Arc::new(StubTokenModule::with_tokens(|_, _| Some("   ".to_string())));
    let (router, _) = relay(&upstreams, module);

    let (status, body) = fetch_json(&router, "/movie/550").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap_or_default();
    assert!(message.starts_with("Token derivation failed"), "{message}");
    assert_eq!(upstreams.request_count().await, 0);
}

#[tokio::test]
async fn test_module_that_never_becomes_ready_fails_request() {
    let upstreams = Upstreams::start().await;
    let module = Arc::new(StubTokenModule::with_token("tok").never_ready());
    let (router, state) = relay(&upstreams, module.clone());

    let (status, _) = fetch_json(&router, "/movie/550").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!state.tokens.is_ready());
    assert_eq!(module.derive_count(), 0);
    assert_eq!(upstreams.request_count().await, 0);
}

#[tokio::test]
async fn test_upstream_status_becomes_internal_error() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/api/b/movie/tok550"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&upstreams.provider)
        .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/movie/550").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "API status 403");
}

#[tokio::test]
async fn test_playlist_failure_is_swallowed() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/api/b/movie/tok550"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stream": { "playlist": "/hls/550/master.m3u8" }
        })))
        .mount(&upstreams.provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/550/master.m3u8"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&upstreams.provider)
        .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/movie/550").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playlist"], serde_json::Value::Null);
    assert_eq!(body["stream"]["playlist"], "/hls/550/master.m3u8");
}

#[tokio::test]
async fn test_relay_fields_win_over_payload_keys() {
    let upstreams = Upstreams::start().await;
    let origin = upstreams.provider.uri();
    Mock::given(method("GET"))
        .and(path("/api/b/movie/tok550"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "api_url": "https://elsewhere.example/",
            "headers": "spoofed",
            "playlist": "#EXTM3U spoofed",
            "movieId": "999",
            "quality": "1080p"
        })))
        .mount(&upstreams.provider)
        .await;

    let (router, _) = relay(&upstreams, keyed_tokens());
    let (status, body) = fetch_json(&router, "/movie/550").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["api_url"],
        format!("{origin}/api/b/movie/tok550?multiLang=0")
    );
    assert!(body["headers"].is_object());
    assert_eq!(body["playlist"], serde_json::Value::Null);
    assert_eq!(body["movieId"], "550");
    assert_eq!(body["quality"], "1080p");
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_context() {
    let upstreams = Upstreams::start().await;
    // Token is only valid when the context matches the key it was derived for
    let module = Arc::new(StubTokenModule::with_tokens(|key, context: &PageContext| {
        if context.path.ends_with(&format!("/{key}")) {
            Some(format!("ok{key}"))
        } else {
            Some("mismatch".to_string())
        }
    }));

    Mock::given(method("GET"))
        .and(path("/api/b/movie/ok550"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "movie" })))
        .mount(&upstreams.provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/b/tv/ok1399/2/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "episode" })))
        .mount(&upstreams.provider)
        .await;

    let (router, _) = relay(&upstreams, module.clone());
    let ((movie_status, movie), (episode_status, episode)) = futures::join!(
        fetch_json(&router, "/movie/550"),
        fetch_json(&router, "/series/1399/2/3"),
    );

    assert_eq!(movie_status, StatusCode::OK);
    assert_eq!(episode_status, StatusCode::OK);
    assert_eq!(movie["kind"], "movie");
    assert_eq!(episode["kind"], "episode");

    let mut paths: Vec<String> = module
        .seen_contexts()
        .into_iter()
        .map(|context| context.path)
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["/movie/550".to_string(), "/tv/1399".to_string()]);
}
