//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: visited set, crawled-URL order, lifetime failure counts
//! - `CrawlStatistics`: run-level counters
//! - `PageOutcome`: what happened to a single dequeued URL

mod crawl_state;
mod page_outcome;

// Re-export main types
pub use crawl_state::{CrawlState, CrawlStatistics};
pub use page_outcome::PageOutcome;
