//! Admission filter for discovered links
//!
//! A link is admissible if its identity has not been visited, its host is
//! the allowed host, and no exclusion pattern matches the raw URL.

use crate::config::Config;
use crate::state::CrawlState;
use crate::url::{extract_host, host_matches};
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use std::fmt;
use tracing::warn;
use url::Url;

/// Result of checking one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Link may be enqueued
    Admitted,

    /// Link's identity is already in the visited set
    AlreadyVisited,

    /// Link points outside the allowed host
    ForeignHost,

    /// Link matched the contained exclusion pattern
    Excluded(String),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }

    /// Human-readable reason, matching the `(bool, reason)` shape of log lines
    pub fn reason(&self) -> String {
        match self {
            Self::Admitted => "admitted".to_string(),
            Self::AlreadyVisited => "already visited".to_string(),
            Self::ForeignHost => "outside allowed domain".to_string(),
            Self::Excluded(pattern) => format!("matches exclusion pattern {}", pattern),
        }
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

/// Compiled exclusion patterns
///
/// Patterns that fail to compile are logged once and dropped, so they never
/// match anything.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<Regex>,
}

impl ExclusionSet {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Ignoring invalid exclusion pattern");
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// Returns the first pattern found anywhere in `url`
    pub fn matching(&self, url: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|regex| regex.is_match(url))
            .map(|regex| regex.as_str())
    }

    /// Number of usable patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Decides whether discovered links may enter the queue
#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    allowed_host: String,
    exclusions: ExclusionSet,
}

impl AdmissionFilter {
    /// Creates a filter for `allowed_domain` (an absolute URL)
    pub fn new(allowed_domain: &str, exclude_patterns: &[String]) -> ConfigResult<Self> {
        let url = Url::parse(allowed_domain)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", allowed_domain, e)))?;
        let allowed_host = extract_host(&url).ok_or_else(|| {
            ConfigError::InvalidUrl(format!("{}: allowed domain has no host", allowed_domain))
        })?;

        Ok(Self {
            allowed_host,
            exclusions: ExclusionSet::new(exclude_patterns),
        })
    }

    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        Self::new(&config.target.allowed_domain, &config.crawl.exclude_patterns)
    }

    pub fn allowed_host(&self) -> &str {
        &self.allowed_host
    }

    /// Checks one raw URL against the visited set, host boundary and exclusions
    pub fn check(&self, url: &str, state: &CrawlState) -> Admission {
        if state.is_visited(url) {
            return Admission::AlreadyVisited;
        }

        if !host_matches(url, &self.allowed_host) {
            return Admission::ForeignHost;
        }

        if let Some(pattern) = self.exclusions.matching(url) {
            return Admission::Excluded(pattern.to_string());
        }

        Admission::Admitted
    }
}
