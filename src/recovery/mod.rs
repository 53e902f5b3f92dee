//! Checkpointing and resume support
//!
//! A checkpoint is a JSON snapshot of the crawl state plus a checksum of the
//! crawl-relevant configuration. It is written every `save-interval`
//! successful fetches, once more when a crawl is interrupted, and deleted when
//! a crawl drains cleanly.

mod checkpoint;
mod manager;

use std::path::PathBuf;
use thiserror::Error;

pub use checkpoint::{PendingUrl, RecoveryState};
pub use manager::{RecoveryManager, Resume, ResumeInfo};

/// Checkpoint persistence errors
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Checkpoint IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checkpoint was written under a different configuration (saved {saved}, current {current})")]
    ChecksumMismatch { saved: String, current: String },

    #[error("No checkpoint at {0}")]
    Missing(PathBuf),

    #[error("Recovery is disabled")]
    Disabled,
}

/// Result type alias for recovery operations
pub type RecoveryResult<T> = std::result::Result<T, RecoveryError>;
