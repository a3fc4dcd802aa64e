//! URL handling module for Spinneret
//!
//! This module provides the lexical path expansion and URL sanitization
//! used everywhere a URL enters the crawl: queue admission, visit-time
//! normalization, link resolution, and credential scoping.

mod normalize;

// Re-export main functions
pub use normalize::{expand_path, sanitize, to_absolute};
