use crate::config::types::{
    Config, CrawlConfig, ExecutionConfig, ExtractorConfig, OutputConfig, RecoveryConfig,
    RetryConfig, TargetConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound for the inter-request delay (seconds)
const MAX_REQUEST_DELAY: f64 = 60.0;

/// Validates the entire configuration
///
/// Exclusion patterns are deliberately not compiled here: a malformed pattern
/// is reported and ignored by the admission filter instead of failing startup.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_crawl_config(&config.crawl)?;
    validate_extractor_config(&config.extractor)?;
    validate_output_config(&config.output)?;
    validate_execution_config(&config.execution)?;
    validate_retry_config(&config.retry)?;
    validate_recovery_config(&config.recovery)?;
    Ok(())
}

/// Validates the target site: both URLs absolute http(s) on the same host
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let start = validate_http_url("start-url", &config.start_url)?;
    let allowed = validate_http_url("allowed-domain", &config.allowed_domain)?;

    let start_host = start.host_str().map(str::to_lowercase);
    let allowed_host = allowed.host_str().map(str::to_lowercase);
    if start_host != allowed_host {
        return Err(ConfigError::Validation(format!(
            "start-url host {:?} is outside allowed-domain host {:?}",
            start_host.unwrap_or_default(),
            allowed_host.unwrap_or_default()
        )));
    }

    Ok(())
}

/// Parses a URL and checks it is absolute, http(s), and has a host
fn validate_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use the http or https scheme",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(url)
}

/// Validates link discovery rules
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_selector("navigation-selector", &config.navigation_selector)
}

/// Validates the content extraction rule
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    validate_selector("content-selector", &config.content_selector)
}

/// Checks that a CSS selector is non-empty and parses
fn validate_selector(field: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("{} '{}': {:?}", field, selector, e))
    })?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.base_dir.trim().is_empty() {
        return Err(ConfigError::Validation("base-dir cannot be empty".to_string()));
    }

    if config.image_dir_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "image-dir-name cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates request pacing
fn validate_execution_config(config: &ExecutionConfig) -> Result<(), ConfigError> {
    if !config.request_delay.is_finite()
        || config.request_delay < 0.0
        || config.request_delay > MAX_REQUEST_DELAY
    {
        return Err(ConfigError::Validation(format!(
            "request-delay must be between 0 and {} seconds, got {}",
            MAX_REQUEST_DELAY, config.request_delay
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout must be >= 1 second, got {}",
            config.request_timeout
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry and backoff parameters
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if !config.initial_delay.is_finite() || config.initial_delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "initial-delay must be >= 0, got {}",
            config.initial_delay
        )));
    }

    if !config.backoff_factor.is_finite() || config.backoff_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-factor must be >= 1, got {}",
            config.backoff_factor
        )));
    }

    if !config.max_delay.is_finite() || config.max_delay < config.initial_delay {
        return Err(ConfigError::Validation(format!(
            "max-delay must be >= initial-delay ({}), got {}",
            config.initial_delay, config.max_delay
        )));
    }

    if config.skip_after_failures < 1 {
        return Err(ConfigError::Validation(
            "skip-after-failures must be >= 1".to_string(),
        ));
    }

    if let Some(code) = config
        .retry_status_codes
        .iter()
        .find(|code| !(100..=599).contains(*code))
    {
        return Err(ConfigError::Validation(format!(
            "retry-status-codes contains invalid HTTP status {}",
            code
        )));
    }

    Ok(())
}

/// Validates checkpoint settings
fn validate_recovery_config(config: &RecoveryConfig) -> Result<(), ConfigError> {
    if config.save_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "save-interval must be >= 1, got {}",
            config.save_interval
        )));
    }

    if config.enable_recovery && config.recovery_file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "recovery-file cannot be empty when recovery is enabled".to_string(),
        ));
    }

    Ok(())
}
