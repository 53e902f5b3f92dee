use crate::state::{CrawlState, CrawlStatistics};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A queued URL carried across a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUrl {
    pub url: String,
    pub priority: u32,
}

/// Durable snapshot of crawl progress
///
/// `pending_urls` holds the frontier in dequeue order. A resumed crawl
/// re-queues it together with the start URL and relies on `visited_urls` to
/// skip finished pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryState {
    /// Start URL of the crawl that wrote this checkpoint
    pub start_url: String,

    /// Canonical raw URLs of every visited page
    #[serde(default)]
    pub visited_urls: Vec<String>,

    /// Lifetime failure count per raw URL
    #[serde(default)]
    pub failed_url_counts: BTreeMap<String, u32>,

    /// Pages fetched and handed to the converter
    #[serde(default)]
    pub processed_count: u64,

    /// Pages the converter wrote successfully
    #[serde(default)]
    pub success_count: u64,

    /// Fetches that ended in a terminal failure
    #[serde(default)]
    pub failed_count: u64,

    /// Dequeued URLs that were skipped
    #[serde(default)]
    pub skipped_count: u64,

    /// Failed checkpoint writes and deletions
    #[serde(default)]
    pub persistence_error_count: u64,

    /// Images linked remotely after a failed download
    #[serde(default)]
    pub image_failure_count: u64,

    /// Successfully fetched URLs in crawl order
    #[serde(default)]
    pub crawled_urls: Vec<String>,

    /// URLs still queued when the snapshot was taken
    #[serde(default)]
    pub pending_urls: Vec<PendingUrl>,

    /// When the snapshot was taken (RFC 3339)
    pub timestamp: String,

    /// Checksum of the crawl-relevant configuration
    pub config_checksum: String,
}

impl RecoveryState {
    /// Takes a snapshot of the current crawl state
    pub fn capture(
        start_url: &str,
        state: &CrawlState,
        pending: &[PendingUrl],
        config_checksum: &str,
    ) -> Self {
        Self {
            start_url: start_url.to_string(),
            visited_urls: state.visited_urls(),
            failed_url_counts: state
                .failure_counts()
                .iter()
                .map(|(url, count)| (url.clone(), *count))
                .collect(),
            processed_count: state.stats.fetched,
            success_count: state.stats.converted,
            failed_count: state.stats.failed,
            skipped_count: state.stats.skipped,
            persistence_error_count: state.stats.persistence_errors,
            image_failure_count: state.stats.image_failures,
            crawled_urls: state.crawled_urls().to_vec(),
            pending_urls: pending.to_vec(),
            timestamp: Utc::now().to_rfc3339(),
            config_checksum: config_checksum.to_string(),
        }
    }

    /// Rebuilds the crawl state this snapshot was taken from
    ///
    /// Converter failures are not stored separately; they are recovered as
    /// the difference between processed and successful pages.
    pub fn to_crawl_state(&self) -> CrawlState {
        let failures: HashMap<String, u32> = self
            .failed_url_counts
            .iter()
            .map(|(url, count)| (url.clone(), *count))
            .collect();

        let stats = CrawlStatistics {
            fetched: self.processed_count,
            converted: self.success_count,
            convert_failed: self.processed_count.saturating_sub(self.success_count),
            failed: self.failed_count,
            skipped: self.skipped_count,
            persistence_errors: self.persistence_error_count,
            image_failures: self.image_failure_count,
        };

        CrawlState::from_parts(
            &self.visited_urls,
            self.crawled_urls.clone(),
            failures,
            stats,
        )
    }
}
