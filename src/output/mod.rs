//! Output module for converted pages and run summaries
//!
//! This module handles:
//! - The converter interface the crawl loop hands pages to
//! - The default HTML to Markdown converter
//! - Printing the run summary

mod markdown;
mod stats;
mod traits;

pub use markdown::MarkdownConverter;
pub use stats::{format_summary, print_summary};
pub use traits::{ContentConverter, ConvertedPage, OutputError, OutputResult};
