use serde::{Deserialize, Serialize};

/// Main configuration structure for Sumi-Scroll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Builds a configuration for a site with every other section defaulted
    pub fn for_site(start_url: impl Into<String>, allowed_domain: impl Into<String>) -> Self {
        Self {
            target: TargetConfig {
                start_url: start_url.into(),
                allowed_domain: allowed_domain.into(),
            },
            crawl: CrawlConfig::default(),
            extractor: ExtractorConfig::default(),
            output: OutputConfig::default(),
            execution: ExecutionConfig::default(),
            retry: RetryConfig::default(),
            recovery: RecoveryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// The site being crawled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Absolute URL the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Absolute URL whose host is the crawl boundary
    #[serde(rename = "allowed-domain")]
    pub allowed_domain: String,
}

/// Link discovery rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// CSS selector for the navigation region links are taken from
    #[serde(rename = "navigation-selector", default = "default_navigation_selector")]
    pub navigation_selector: String,

    /// Regular expressions matched against raw URLs; a match rejects the link
    #[serde(rename = "exclude-patterns", default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            navigation_selector: default_navigation_selector(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// Main-content extraction rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// CSS selector for the element holding the page's main content
    #[serde(rename = "content-selector", default = "default_content_selector")]
    pub content_selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            content_selector: default_content_selector(),
        }
    }
}

/// Output layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the Markdown tree is written to
    #[serde(rename = "base-dir", default = "default_base_dir")]
    pub base_dir: String,

    /// Name of the image directory inside `base_dir`
    #[serde(rename = "image-dir-name", default = "default_image_dir_name")]
    pub image_dir_name: String,

    /// Download images locally instead of linking to the origin
    #[serde(rename = "download-images", default = "default_true")]
    pub download_images: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            image_dir_name: default_image_dir_name(),
            download_images: true,
        }
    }
}

/// Request pacing and client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Delay between page requests (seconds)
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: f64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            request_delay: default_request_delay(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry and backoff behavior for page fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt of a single fetch
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (seconds)
    #[serde(rename = "initial-delay", default = "default_initial_delay")]
    pub initial_delay: f64,

    /// Multiplier applied to the delay for each further retry
    #[serde(rename = "backoff-factor", default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound for any retry delay (seconds)
    #[serde(rename = "max-delay", default = "default_max_delay")]
    pub max_delay: f64,

    /// HTTP status codes worth retrying
    #[serde(rename = "retry-status-codes", default = "default_retry_status_codes")]
    pub retry_status_codes: Vec<u16>,

    /// Lifetime failures after which a URL is never attempted again
    #[serde(rename = "skip-after-failures", default = "default_skip_after_failures")]
    pub skip_after_failures: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            backoff_factor: default_backoff_factor(),
            max_delay: default_max_delay(),
            retry_status_codes: default_retry_status_codes(),
            skip_after_failures: default_skip_after_failures(),
        }
    }
}

/// Checkpointing behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Path of the checkpoint file
    #[serde(rename = "recovery-file", default = "default_recovery_file")]
    pub recovery_file: String,

    /// Successful fetches between checkpoint writes
    #[serde(rename = "save-interval", default = "default_save_interval")]
    pub save_interval: u32,

    /// Whether checkpoints are written and read at all
    #[serde(rename = "enable-recovery", default = "default_true")]
    pub enable_recovery: bool,

    /// Offer to resume from a valid checkpoint on startup
    #[serde(rename = "auto-resume", default = "default_true")]
    pub auto_resume: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            recovery_file: default_recovery_file(),
            save_interval: default_save_interval(),
            enable_recovery: true,
            auto_resume: true,
        }
    }
}

/// Log sink settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when no verbosity flag is given
    #[serde(default)]
    pub level: Option<String>,

    /// Optional file receiving a plain-text copy of the log
    #[serde(default)]
    pub file: Option<String>,
}

fn default_navigation_selector() -> String {
    "nav".to_string()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        r".*#.*".to_string(),
        r".*/search\.html".to_string(),
        r".*/genindex\.html".to_string(),
    ]
}

fn default_content_selector() -> String {
    "main".to_string()
}

fn default_base_dir() -> String {
    "./output".to_string()
}

fn default_image_dir_name() -> String {
    "images".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_delay() -> f64 {
    1.0
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("sumi-scroll/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> f64 {
    1.0
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    30.0
}

fn default_retry_status_codes() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_skip_after_failures() -> u32 {
    5
}

fn default_recovery_file() -> String {
    "./recovery_state.json".to_string()
}

fn default_save_interval() -> u32 {
    10
}
