//! URL handling module for Sumi-Scroll
//!
//! This module provides identity normalization, host extraction and the
//! host boundary check used to keep the crawl on a single site.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, host_matches, path_depth};
pub use normalize::normalize;
