//! Content converter trait and output errors
//!
//! The crawl loop hands every successfully fetched page to a
//! [`ContentConverter`] exactly once. Converter failures are counted by the
//! caller and never stop the crawl.

use crate::crawler::FetchedPage;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while converting a page
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No element matches the content selector on {url}")]
    NoContent { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// What a successful conversion produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPage {
    /// Path of the written file
    pub path: PathBuf,

    /// Images that could not be fetched and were linked remotely instead
    pub image_failures: u64,
}

impl ConvertedPage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            image_failures: 0,
        }
    }
}

/// Turns a fetched page into a file on disk
pub trait ContentConverter {
    /// Converts one page and reports the written file
    fn convert(
        &mut self,
        page: &FetchedPage,
    ) -> impl Future<Output = OutputResult<ConvertedPage>>;
}
