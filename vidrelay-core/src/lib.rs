//! Vidrelay Core - Token derivation and stream relaying
//!
//! This crate provides the building blocks for relaying provider manifests:
//! configuration, the lazily initialized token module handle, the call policy
//! that separates required lookups from best-effort enrichments, and the
//! stream fetcher that chains them together.

pub mod config;
pub mod content;
pub mod policy;
pub mod stream;
pub mod token;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::RelayConfig;
pub use content::{ContentRef, PageContext};
pub use policy::CallPolicy;
pub use stream::{StreamError, StreamFetcher, StreamResult};
pub use token::{TokenError, TokenModule, TokenProvider};
