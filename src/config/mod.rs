//! Configuration module for Sumi-Scroll
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and computes the checksum that ties a checkpoint to the
//! configuration it was written under.
//!
//! # Example
//!
//! ```no_run
//! use sumi_scroll::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawl starts at: {}", config.target.start_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, ExecutionConfig, ExtractorConfig, LoggingConfig, OutputConfig,
    RecoveryConfig, RetryConfig, TargetConfig,
};

// Re-export parser functions
pub use parser::{compute_config_checksum, load_config, parse_config};
pub use validation::validate;
