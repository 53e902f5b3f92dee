use crate::url::normalize;
use std::collections::HashMap;

/// Run-level counters
///
/// Every counter only ever increases during a run; a resumed run starts from
/// the values stored in the checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Pages fetched successfully and handed to the converter
    pub fetched: u64,

    /// Pages the converter wrote successfully
    pub converted: u64,

    /// Pages the converter rejected
    pub convert_failed: u64,

    /// Fetches that ended in a terminal failure
    pub failed: u64,

    /// Dequeued URLs skipped as already visited or auto-skipped
    pub skipped: u64,

    /// Checkpoint writes or deletions that failed
    pub persistence_errors: u64,

    /// Images that could not be downloaded and were linked remotely
    pub image_failures: u64,
}

impl CrawlStatistics {
    /// Sum of all non-fatal error counters
    pub fn error_total(&self) -> u64 {
        self.convert_failed + self.failed + self.persistence_errors + self.image_failures
    }
}

/// Mutable progress of a crawl
///
/// Holds the visited set (normalized URL → first-seen raw URL), the ordered
/// list of crawled URLs, the per-URL lifetime failure counts and the run
/// statistics. This is exactly the information a checkpoint carries.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    visited: HashMap<String, String>,
    crawled: Vec<String>,
    failures: HashMap<String, u32>,
    pub stats: CrawlStatistics,
}

impl CrawlState {
    /// Creates an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a URL with the same identity was already visited
    pub fn is_visited(&self, raw_url: &str) -> bool {
        self.visited.contains_key(&normalize(raw_url))
    }

    /// Marks a URL as visited
    ///
    /// The first raw form seen for an identity stays canonical. Returns false
    /// (and changes nothing) if the identity was already present.
    pub fn mark_visited(&mut self, raw_url: &str) -> bool {
        let key = normalize(raw_url);
        if self.visited.contains_key(&key) {
            return false;
        }

        self.visited.insert(key, raw_url.to_string());
        self.crawled.push(raw_url.to_string());
        true
    }

    /// Inserts a visited entry without touching the crawled list
    fn restore_visited(&mut self, raw_url: &str) {
        self.visited
            .entry(normalize(raw_url))
            .or_insert_with(|| raw_url.to_string());
    }

    /// Number of distinct visited identities
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Canonical raw URLs of the visited set, sorted for stable output
    pub fn visited_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.visited.values().cloned().collect();
        urls.sort();
        urls
    }

    /// Raw URLs in the order they were successfully fetched
    pub fn crawled_urls(&self) -> &[String] {
        &self.crawled
    }

    /// Lifetime failure count of a raw URL
    pub fn failure_count(&self, raw_url: &str) -> u32 {
        self.failures.get(raw_url).copied().unwrap_or(0)
    }

    /// Records one failed attempt and returns the new lifetime count
    pub fn record_failure(&mut self, raw_url: &str) -> u32 {
        let count = self.failures.entry(raw_url.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// All lifetime failure counts
    pub fn failure_counts(&self) -> &HashMap<String, u32> {
        &self.failures
    }

    /// URLs whose failure count reached `threshold`, sorted
    pub fn auto_skipped(&self, threshold: u32) -> Vec<String> {
        let mut urls: Vec<String> = self
            .failures
            .iter()
            .filter(|(_, count)| **count >= threshold)
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }

    /// Rebuilds a state from persisted parts
    ///
    /// `visited` may contain several raw forms of one identity; the first one
    /// wins. Crawled URLs not present in `visited` are added to it.
    pub fn from_parts(
        visited: &[String],
        crawled: Vec<String>,
        failures: HashMap<String, u32>,
        stats: CrawlStatistics,
    ) -> Self {
        let mut state = Self {
            visited: HashMap::with_capacity(visited.len()),
            crawled: Vec::new(),
            failures,
            stats,
        };

        for url in visited {
            state.restore_visited(url);
        }
        for url in &crawled {
            state.restore_visited(url);
        }
        state.crawled = crawled;

        state
    }
}
