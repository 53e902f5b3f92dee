//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client from the execution settings
//! - Single GET attempts with failure classification
//!
//! Retrying lives in the coordinator; one call here is one attempt.

use super::retry::FetchFailure;
use crate::config::ExecutionConfig;
use reqwest::Client;
use std::time::Duration;

/// A page that was fetched successfully
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Raw URL the page was requested under
    pub url: String,

    /// Response body
    pub html: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The execution settings (user agent, timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_scroll::config::ExecutionConfig;
/// use sumi_scroll::crawler::build_http_client;
///
/// let client = build_http_client(&ExecutionConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ExecutionConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.request_timeout.max(1));

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Makes one GET attempt for `url`
///
/// # Failure classes
///
/// | Condition | Result |
/// |-----------|--------|
/// | Request timed out | `Timeout` |
/// | Connection refused / DNS / TLS | `Connection` |
/// | Non-2xx status | `Status(code)` |
/// | Body could not be read or decoded | `Transport` |
/// | Anything else | `Transport` |
pub async fn fetch_once(client: &Client, url: &str) -> Result<FetchedPage, FetchFailure> {
    let response = client.get(url).send().await.map_err(classify_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchFailure::Status(status.as_u16()));
    }

    let html = response.text().await.map_err(|e| {
        if e.is_timeout() {
            FetchFailure::Timeout
        } else {
            FetchFailure::Transport(e.to_string())
        }
    })?;

    Ok(FetchedPage {
        url: url.to_string(),
        html,
    })
}

/// Maps a reqwest error onto a failure class
fn classify_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else if e.is_connect() {
        FetchFailure::Connection(e.to_string())
    } else {
        FetchFailure::Transport(e.to_string())
    }
}
