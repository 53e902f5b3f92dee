//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - Navigation link extraction and admission
//! - The priority queue that orders the crawl
//! - Overall crawl coordination

mod admission;
mod coordinator;
mod fetcher;
mod parser;
mod queue;
mod retry;

pub use admission::{Admission, AdmissionFilter, ExclusionSet};
pub use coordinator::{run_crawl, CancelFlag, Coordinator, CrawlPhase, CrawlReport};
pub use fetcher::{build_http_client, fetch_once, FetchedPage};
pub use parser::{extract_navigation_links, resolve_link, NavLink};
pub use queue::{link_priority, PriorityQueue, QueuedUrl, BASE_PRIORITY, KEYWORD_ADJUSTMENT};
pub use retry::{FetchFailure, RetryDecision, RetryPolicy};
