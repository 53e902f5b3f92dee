//! Crawl frontier
//!
//! A min-priority queue of raw URLs. Lower priority values are fetched
//! first; entries with equal priority come out in insertion order.

use crate::url::path_depth;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use url::Url;

/// Priority every link starts from
pub const BASE_PRIORITY: u32 = 10;

/// Adjustment applied when the anchor text matches a keyword list
pub const KEYWORD_ADJUSTMENT: u32 = 5;

/// Anchor keywords that pull a link forward
const INTRO_KEYWORDS: &[&str] = &[
    "overview",
    "getting started",
    "getting-started",
    "introduction",
    "intro",
    "quickstart",
    "quick start",
    "tutorial",
];

/// Anchor keywords that push a link back
const REFERENCE_KEYWORDS: &[&str] = &[
    "reference",
    "appendix",
    "glossary",
    "changelog",
    "release notes",
];

/// A URL waiting in the frontier
#[derive(Debug, Clone)]
pub struct QueuedUrl {
    /// Priority value (lower is fetched earlier)
    pub priority: u32,

    /// Insertion sequence, breaks ties FIFO
    pub sequence: u64,

    /// Raw URL as discovered
    pub url: String,
}

// BinaryHeap is a max-heap, so both comparisons are reversed
impl Ord for QueuedUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for QueuedUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedUrl {}

/// Frontier of URLs to fetch
///
/// The queue does not deduplicate; the same URL may be queued more than once
/// and is skipped as already visited when dequeued the second time.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<QueuedUrl>,
    next_sequence: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL with the given priority
    pub fn put(&mut self, url: impl Into<String>, priority: u32) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.heap.push(QueuedUrl {
            priority,
            sequence,
            url: url.into(),
        });
    }

    /// Removes the URL with the lowest priority value
    pub fn get(&mut self) -> Option<String> {
        self.heap.pop().map(|entry| entry.url)
    }

    /// Removes the next entry, keeping its priority
    pub fn get_entry(&mut self) -> Option<QueuedUrl> {
        self.heap.pop()
    }

    /// Every queued entry in the order `get` would return them
    pub fn entries(&self) -> Vec<QueuedUrl> {
        let mut entries: Vec<QueuedUrl> = self.heap.iter().cloned().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries
    }

    /// Looks at the next entry without removing it
    pub fn peek(&self) -> Option<&QueuedUrl> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Computes the queue priority of a discovered link
///
/// Starts at [`BASE_PRIORITY`], adds one per non-empty path segment, subtracts
/// [`KEYWORD_ADJUSTMENT`] for introductory anchor text and adds it for
/// reference-style anchor text. The result never goes below zero.
pub fn link_priority(url: &Url, anchor_text: &str) -> u32 {
    let text = anchor_text.to_lowercase();
    let mut priority = BASE_PRIORITY.saturating_add(path_depth(url));

    if INTRO_KEYWORDS.iter().any(|k| text.contains(k)) {
        priority = priority.saturating_sub(KEYWORD_ADJUSTMENT);
    }
    if REFERENCE_KEYWORDS.iter().any(|k| text.contains(k)) {
        priority = priority.saturating_add(KEYWORD_ADJUSTMENT);
    }

    priority
}
