//! Per-page outcome definitions for crawl reporting
//!
//! Every dequeued URL ends its loop iteration in exactly one of these outcomes.

use std::fmt;

/// Represents what happened to a URL taken from the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    // ===== Success States =====
    /// Page was fetched and the converter wrote it
    Converted,

    // ===== Skip States =====
    /// Identity was already visited earlier in the run (or a previous run)
    AlreadyVisited,

    /// Lifetime failure count reached the skip threshold
    AutoSkipped,

    /// Crawl was cancelled while the fetch waited to retry; the URL goes back
    /// into the queue
    Cancelled,

    // ===== Error States =====
    /// Page was fetched but the converter failed
    ConvertFailed,

    /// Fetch ended in a terminal failure
    FetchFailed,
}

impl PageOutcome {
    /// Returns true if this represents a successful conversion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Converted)
    }

    /// Returns true if the URL was not fetched at all
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::AlreadyVisited | Self::AutoSkipped | Self::Cancelled)
    }

    /// Returns true if this represents an error
    pub fn is_error(&self) -> bool {
        matches!(self, Self::ConvertFailed | Self::FetchFailed)
    }

    /// Returns true if the page was fetched (regardless of conversion)
    pub fn was_fetched(&self) -> bool {
        matches!(self, Self::Converted | Self::ConvertFailed)
    }

    /// Short machine-readable name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Converted => "converted",
            Self::AlreadyVisited => "already_visited",
            Self::AutoSkipped => "auto_skipped",
            Self::Cancelled => "cancelled",
            Self::ConvertFailed => "convert_failed",
            Self::FetchFailed => "fetch_failed",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
