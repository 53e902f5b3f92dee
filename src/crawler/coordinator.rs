//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding the queue (fresh or resumed)
//! - Fetching pages through the retry policy
//! - Handing pages to the content converter
//! - Filtering and enqueueing navigation links
//! - Checkpointing and handling interrupts

use crate::config::Config;
use crate::crawler::admission::AdmissionFilter;
use crate::crawler::fetcher::{build_http_client, fetch_once, FetchedPage};
use crate::crawler::parser::extract_navigation_links;
use crate::crawler::queue::{link_priority, PriorityQueue};
use crate::crawler::retry::{FetchFailure, RetryDecision, RetryPolicy};
use crate::output::{ContentConverter, MarkdownConverter};
use crate::recovery::{PendingUrl, RecoveryManager, RecoveryState};
use crate::state::{CrawlState, CrawlStatistics, PageOutcome};
use crate::url::normalize;
use crate::{ScrollError, Result};
use reqwest::Client;
use scraper::Selector;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Shared flag that asks a running crawl to stop at the next iteration
pub type CancelFlag = Arc<AtomicBool>;

/// Priority of the start URL
const SEED_PRIORITY: u32 = 0;

/// Pages between progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Longest stretch a pause sleeps before looking at the cancel flag again
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Start URL queued, loop not started
    Seeded,
    /// Loop is processing the queue
    Running,
    /// Queue ran empty
    Drained,
    /// Stopped by cancellation before the queue ran empty
    Interrupted,
}

/// What a drained crawl reports back
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Final counters (including those restored from a checkpoint)
    pub stats: CrawlStatistics,

    /// URLs that reached the auto-skip threshold
    pub auto_skipped: Vec<String>,

    /// Successfully fetched URLs in crawl order
    pub crawled: Vec<String>,

    /// Wall time of this run
    pub elapsed: Duration,
}

/// Main crawler coordinator structure
///
/// Owns the queue, the crawl state and the converter. Recovery is optional;
/// without a manager nothing is written to disk besides converter output.
pub struct Coordinator<C> {
    start_url: String,
    client: Client,
    nav_selector: Selector,
    admission: AdmissionFilter,
    retry: RetryPolicy,
    request_delay: Duration,
    queue: PriorityQueue,
    state: CrawlState,
    converter: C,
    recovery: Option<RecoveryManager>,
    cancel: CancelFlag,
    phase: CrawlPhase,
}

impl<C: ContentConverter> Coordinator<C> {
    /// Creates a coordinator with the start URL queued
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    /// * `client` - HTTP client used for page fetches
    /// * `converter` - Receives every successfully fetched page
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to `run`
    /// * `Err(ScrollError)` - A selector or the allowed domain is unusable
    pub fn new(config: &Config, client: Client, converter: C) -> Result<Self> {
        let selector = &config.crawl.navigation_selector;
        let nav_selector = Selector::parse(selector).map_err(|e| ScrollError::Selector {
            selector: selector.clone(),
            message: format!("{:?}", e),
        })?;

        let admission = AdmissionFilter::from_config(config)?;

        let mut queue = PriorityQueue::new();
        queue.put(config.target.start_url.clone(), SEED_PRIORITY);

        Ok(Self {
            start_url: config.target.start_url.clone(),
            client,
            nav_selector,
            admission,
            retry: RetryPolicy::from_config(&config.retry),
            request_delay: Duration::try_from_secs_f64(config.execution.request_delay.max(0.0))
                .unwrap_or(Duration::ZERO),
            queue,
            state: CrawlState::new(),
            converter,
            recovery: None,
            cancel: Arc::new(AtomicBool::new(false)),
            phase: CrawlPhase::Seeded,
        })
    }

    /// Attaches a recovery manager for checkpointing
    pub fn with_recovery(mut self, manager: RecoveryManager) -> Self {
        self.recovery = Some(manager);
        self
    }

    /// Uses an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        Arc::clone(&self.cancel)
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn recovery(&self) -> Option<&RecoveryManager> {
        self.recovery.as_ref()
    }

    /// Replaces the crawl state with a checkpoint and re-seeds the queue
    ///
    /// The queue gets the start URL plus every saved pending URL that is not
    /// visited yet. Visited pages are skipped when they come up, so no page
    /// is fetched twice.
    pub fn restore(&mut self, snapshot: &RecoveryState) {
        if snapshot.start_url != self.start_url {
            tracing::warn!(
                saved = %snapshot.start_url,
                current = %self.start_url,
                "Checkpoint start URL differs from configured start URL"
            );
        }

        self.state = snapshot.to_crawl_state();
        self.queue = PriorityQueue::new();
        self.queue.put(self.start_url.clone(), SEED_PRIORITY);
        for pending in &snapshot.pending_urls {
            if !self.state.is_visited(&pending.url) {
                self.queue.put(pending.url.clone(), pending.priority);
            }
        }
        self.phase = CrawlPhase::Seeded;

        tracing::info!(
            visited = self.state.visited_count(),
            queued = self.queue.len(),
            processed = self.state.stats.fetched,
            saved_at = %snapshot.timestamp,
            "Restored crawl state from checkpoint"
        );
    }

    /// Marks a URL as visited; returns false if its identity already was
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.state.mark_visited(url)
    }

    /// Adds a URL to the queue
    pub fn enqueue(&mut self, url: impl Into<String>, priority: u32) {
        let url = url.into();
        tracing::debug!(url = %url, priority, "Enqueued");
        self.queue.put(url, priority);
    }

    /// Fetches a page, retrying per the retry policy
    ///
    /// Every failed attempt raises the URL's lifetime failure count. Before
    /// each attempt the count is checked against the skip threshold; a URL
    /// already at the threshold fails with `FetchFailure::AutoSkipped`
    /// without any request, and a URL that reaches it during this call stops
    /// with the failure that pushed it over. Setting the cancel flag during a
    /// backoff wait ends the call with `FetchFailure::Cancelled`.
    pub async fn fetch(&mut self, url: &str) -> std::result::Result<FetchedPage, FetchFailure> {
        if self.retry.should_auto_skip(self.state.failure_count(url)) {
            return Err(FetchFailure::AutoSkipped);
        }

        let mut attempt = 0u32;
        loop {
            match fetch_once(&self.client, url).await {
                Ok(page) => {
                    if attempt > 0 {
                        tracing::info!(url = %url, attempt, "Fetch succeeded after retry");
                    }
                    return Ok(page);
                }
                Err(failure) => {
                    let failures = self.state.record_failure(url);

                    if self.retry.should_auto_skip(failures) {
                        tracing::warn!(
                            url = %url,
                            failures,
                            reason = %failure,
                            "Failure threshold reached, URL will be skipped from now on"
                        );
                        return Err(failure);
                    }

                    match self.retry.decide(&failure, attempt) {
                        RetryDecision::RetryAfter(delay) => {
                            tracing::debug!(
                                url = %url,
                                attempt,
                                kind = failure.kind(),
                                reason = %failure,
                                delay_ms = delay.as_millis() as u64,
                                "Retrying fetch"
                            );
                            if !self.pause(delay).await {
                                return Err(FetchFailure::Cancelled);
                            }
                            attempt += 1;
                        }
                        RetryDecision::GiveUp => return Err(failure),
                    }
                }
            }
        }
    }

    /// Extracts the admissible navigation links of a page with their priority
    ///
    /// Rejected links are logged with their reason. Admitted links are
    /// deduplicated by identity within the page.
    pub fn admissible_links(&self, page: &FetchedPage) -> Vec<(String, u32)> {
        let Ok(base) = Url::parse(&page.url) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut admitted = Vec::new();

        for link in extract_navigation_links(&page.html, &base, &self.nav_selector) {
            let raw = link.url.to_string();
            let admission = self.admission.check(&raw, &self.state);

            if !admission.is_admitted() {
                tracing::debug!(url = %raw, reason = %admission, "Link rejected");
                continue;
            }
            if !seen.insert(normalize(&raw)) {
                continue;
            }

            let priority = link_priority(&link.url, &link.text);
            tracing::debug!(url = %raw, priority, text = %link.text, "Link admitted");
            admitted.push((raw, priority));
        }

        admitted
    }

    /// Runs the crawl until the queue drains or the cancel flag is set
    ///
    /// On drain the checkpoint is deleted and a report returned. On
    /// cancellation a checkpoint is forced and `ScrollError::Interrupted`
    /// returned.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let start_time = Instant::now();
        let mut handled: u64 = 0;

        self.phase = CrawlPhase::Running;
        tracing::info!(
            start_url = %self.start_url,
            queued = self.queue.len(),
            visited = self.state.visited_count(),
            "Starting crawl"
        );

        loop {
            if self.is_cancelled() {
                return Err(self.interrupt());
            }

            let Some(entry) = self.queue.get_entry() else {
                tracing::info!("Queue is empty, crawl complete");
                break;
            };
            let url = entry.url;

            let outcome = self.process_url(&url).await;
            if outcome == PageOutcome::Cancelled {
                self.queue.put(url, entry.priority);
                return Err(self.interrupt());
            }
            handled += 1;

            if outcome.is_skipped() {
                tracing::debug!(url = %url, outcome = %outcome, "Page skipped");
            } else {
                tracing::info!(url = %url, outcome = %outcome, "Page done");
            }

            if handled % PROGRESS_INTERVAL == 0 {
                let stats = self.state.stats;
                tracing::info!(
                    "Progress: {} fetched, {} failed, {} skipped, {} queued, {:.2} pages/sec",
                    stats.fetched,
                    stats.failed,
                    stats.skipped,
                    self.queue.len(),
                    handled as f64 / start_time.elapsed().as_secs_f64().max(f64::EPSILON)
                );
            }

            if outcome.was_fetched()
                && !self.queue.is_empty()
                && !self.pause(self.request_delay).await
            {
                return Err(self.interrupt());
            }
        }

        self.phase = CrawlPhase::Drained;

        if let Some(manager) = &self.recovery {
            if let Err(e) = manager.cleanup() {
                self.state.stats.persistence_errors += 1;
                tracing::warn!(error = %e, "Failed to delete checkpoint");
            }
        }

        let report = CrawlReport {
            stats: self.state.stats,
            auto_skipped: self.state.auto_skipped(self.retry.skip_after_failures()),
            crawled: self.state.crawled_urls().to_vec(),
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Crawl completed: {} pages fetched in {:?}, {} non-fatal errors",
            report.stats.fetched,
            report.elapsed,
            report.stats.error_total()
        );

        Ok(report)
    }

    /// Handles one dequeued URL
    async fn process_url(&mut self, url: &str) -> PageOutcome {
        if self.state.is_visited(url) {
            self.state.stats.skipped += 1;
            return PageOutcome::AlreadyVisited;
        }

        let failures = self.state.failure_count(url);
        if self.retry.should_auto_skip(failures) {
            self.state.stats.skipped += 1;
            tracing::warn!(url = %url, failures, "Skipping URL after repeated failures");
            return PageOutcome::AutoSkipped;
        }

        let page = match self.fetch(url).await {
            Ok(page) => page,
            Err(FetchFailure::Cancelled) => return PageOutcome::Cancelled,
            Err(failure) => {
                self.state.stats.failed += 1;
                tracing::warn!(url = %url, kind = failure.kind(), reason = %failure, "Fetch failed");
                return PageOutcome::FetchFailed;
            }
        };

        self.mark_visited(url);
        self.state.stats.fetched += 1;

        let outcome = match self.converter.convert(&page).await {
            Ok(converted) => {
                self.state.stats.converted += 1;
                self.state.stats.image_failures += converted.image_failures;
                tracing::debug!(
                    url = %url,
                    path = %converted.path.display(),
                    image_failures = converted.image_failures,
                    "Converted"
                );
                PageOutcome::Converted
            }
            Err(e) => {
                self.state.stats.convert_failed += 1;
                tracing::warn!(url = %url, error = %e, "Conversion failed");
                PageOutcome::ConvertFailed
            }
        };

        for (link, priority) in self.admissible_links(&page) {
            self.enqueue(link, priority);
        }

        self.checkpoint(false);
        outcome
    }

    /// Asks the recovery manager to save; failures are counted and logged
    fn checkpoint(&mut self, force: bool) {
        let Some(manager) = self.recovery.as_mut() else {
            return;
        };

        let pending: Vec<PendingUrl> = self
            .queue
            .entries()
            .into_iter()
            .filter(|entry| !self.state.is_visited(&entry.url))
            .map(|entry| PendingUrl {
                url: entry.url,
                priority: entry.priority,
            })
            .collect();

        if let Err(e) = manager.save(&self.start_url, &self.state, &pending, force) {
            self.state.stats.persistence_errors += 1;
            tracing::warn!(error = %e, forced = force, "Checkpoint write failed");
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Sleeps for `delay` unless cancelled first; returns false on cancellation
    async fn pause(&self, delay: Duration) -> bool {
        let mut remaining = delay;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let step = remaining.min(CANCEL_POLL);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
        !self.is_cancelled()
    }

    /// Forces a checkpoint and builds the interruption error
    fn interrupt(&mut self) -> ScrollError {
        self.phase = CrawlPhase::Interrupted;
        self.checkpoint(true);

        tracing::warn!(
            processed = self.state.stats.fetched,
            queued = self.queue.len(),
            "Crawl interrupted"
        );

        ScrollError::Interrupted {
            processed: self.state.stats.fetched,
        }
    }
}

/// Runs a complete crawl with the default Markdown converter
///
/// This function wires the pieces together:
///
/// 1. Build the HTTP client
/// 2. Create the Markdown converter and recovery manager
/// 3. Restore `resume` into the coordinator when given
/// 4. Run until drained or cancelled
///
/// # Arguments
///
/// * `config` - A validated configuration
/// * `resume` - Checkpoint to continue from, if any
/// * `cancel` - Flag that interrupts the crawl when set
///
/// # Example
///
/// ```no_run
/// use sumi_scroll::config::load_config;
/// use sumi_scroll::crawler::run_crawl;
/// use std::path::Path;
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(&config, None, Arc::new(AtomicBool::new(false))).await?;
/// println!("{} pages", report.stats.fetched);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    resume: Option<RecoveryState>,
    cancel: CancelFlag,
) -> Result<CrawlReport> {
    let client = build_http_client(&config.execution)?;
    let converter = MarkdownConverter::new(config, client.clone())?;

    let mut coordinator = Coordinator::new(config, client, converter)?
        .with_recovery(RecoveryManager::new(config))
        .with_cancel_flag(cancel);

    if let Some(snapshot) = resume {
        coordinator.restore(&snapshot);
    }

    coordinator.run().await
}
