//! Sumi-Scroll: a docs-site to Markdown crawler
//!
//! This crate crawls a single documentation site through its navigation links,
//! hands every fetched page to a content converter that writes Markdown, and
//! checkpoints its progress so an interrupted crawl can be resumed.

pub mod config;
pub mod crawler;
pub mod output;
pub mod recovery;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Scroll operations
#[derive(Debug, Error)]
pub enum ScrollError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Crawl interrupted after {processed} processed pages")]
    Interrupted { processed: u64 },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Sumi-Scroll operations
pub type Result<T> = std::result::Result<T, ScrollError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CancelFlag, Coordinator, CrawlReport};
pub use recovery::{RecoveryManager, RecoveryState, Resume};
pub use url::normalize;
