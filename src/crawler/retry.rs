//! Retry and backoff policy for page fetches
//!
//! Two independent tallies drive the decisions here: the per-call attempt
//! budget (`1 + max_retries` attempts) and the lifetime failure count of a
//! URL, which survives across fetch calls and resumed runs and permanently
//! skips the URL once it reaches `skip_after_failures`.

use crate::config::RetryConfig;
use std::fmt;
use std::time::Duration;

/// Why a single fetch attempt (or a whole fetch call) failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Request exceeded the configured timeout
    Timeout,

    /// Could not connect to the server
    Connection(String),

    /// Server answered with a non-success status
    Status(u16),

    /// Any other transport fault, including an undecodable body
    Transport(String),

    /// Lifetime failure count reached the skip threshold; nothing was sent
    AutoSkipped,

    /// The crawl was cancelled while waiting to retry
    Cancelled,
}

impl FetchFailure {
    /// Short machine-readable kind used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection(_) => "connection",
            Self::Status(_) => "status",
            Self::Transport(_) => "transport",
            Self::AutoSkipped => "auto_skipped",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Connection(e) => write!(f, "connection failed: {}", e),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::AutoSkipped => write!(f, "auto-skipped after repeated failures"),
            Self::Cancelled => write!(f, "cancelled before the next attempt"),
        }
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the given delay, then try again
    RetryAfter(Duration),

    /// Stop; the fetch call is terminally failed
    GiveUp,
}

/// Retry parameters for one crawl
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: f64,
    backoff_factor: f64,
    max_delay: f64,
    retry_status_codes: Vec<u16>,
    skip_after_failures: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: config.initial_delay,
            backoff_factor: config.backoff_factor,
            max_delay: config.max_delay,
            retry_status_codes: config.retry_status_codes.clone(),
            skip_after_failures: config.skip_after_failures,
        }
    }

    /// Most attempts a single fetch call may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn skip_after_failures(&self) -> u32 {
        self.skip_after_failures
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-indexed)
    ///
    /// `min(initial_delay * backoff_factor^attempt, max_delay)`. The product is
    /// built by repeated multiplication so the sequence never decreases.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let mut secs = self.initial_delay.max(0.0);
        for _ in 0..attempt {
            if secs == 0.0 || secs >= self.max_delay || self.backoff_factor <= 1.0 {
                break;
            }
            secs *= self.backoff_factor;
        }

        let secs = secs.min(self.max_delay).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Returns true if a failure of this kind may be retried at all
    pub fn is_retryable(&self, failure: &FetchFailure) -> bool {
        match failure {
            FetchFailure::Timeout | FetchFailure::Connection(_) | FetchFailure::Transport(_) => {
                true
            }
            FetchFailure::Status(code) => self.retry_status_codes.contains(code),
            FetchFailure::AutoSkipped | FetchFailure::Cancelled => false,
        }
    }

    /// Decides what follows failed attempt `attempt` (0-indexed) of one call
    pub fn decide(&self, failure: &FetchFailure, attempt: u32) -> RetryDecision {
        if !self.is_retryable(failure) || attempt >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay_for(attempt))
    }

    /// Returns true if a URL with this lifetime failure count must not be fetched
    pub fn should_auto_skip(&self, failure_count: u32) -> bool {
        failure_count >= self.skip_after_failures
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
