//! Style Enforcement Tests
//!
//! Validates that the workspace crates follow the project's naming and
//! documentation conventions, which clippy does not check.
//!
//! - `source_conventions` - Banned name prefixes/suffixes, generic module
//!   names, `# Errors` doc format and `#[allow(dead_code)]` in library code

#[path = "style/source_conventions.rs"]
mod source_conventions;
