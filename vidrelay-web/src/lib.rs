//! Vidrelay Web - JSON API Server

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Thin router over the stream relay and metadata resolver. Validates path
//! parameters, delegates to the core components and renders their results
//! or errors as JSON.

pub mod error;
pub mod handlers;
pub mod server;

// Re-export main types
pub use error::ApiError;
pub use server::{AppState, build_router, run_server};
