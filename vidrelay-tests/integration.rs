//! Integration tests for Vidrelay
//!
//! These tests drive the complete axum router against wiremock stand-ins for
//! the streaming provider, the search engine and TMDB, with a scripted token
//! module in place of the vendor artifact.

#[path = "style.rs"]
mod style;

#[path = "integration/fixtures.rs"]
mod fixtures;

#[path = "integration/health_routes.rs"]
mod health_routes;
#[path = "integration/search_routes.rs"]
mod search_routes;
#[path = "integration/stream_routes.rs"]
mod stream_routes;
