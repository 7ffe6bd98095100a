//! HTTP request handlers organized by functionality

pub mod api;
pub mod health;

// Re-export handler functions
pub use api::{episode_stream, movie_stream, search_metadata};
pub use health::health;
