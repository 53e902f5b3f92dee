use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_scroll::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Allowed domain: {}", config.target.allowed_domain);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 checksum of the crawl-relevant configuration
///
/// Only the `target`, `crawl`, `extractor` and `output` sections take part:
/// changing any of them invalidates a saved checkpoint, while pacing, retry,
/// recovery and logging settings can change between runs freely. Object keys
/// are sorted before hashing so the checksum does not depend on field order.
///
/// # Returns
///
/// Hex-encoded SHA-256 digest (64 characters)
pub fn compute_config_checksum(config: &Config) -> String {
    let subset = serde_json::json!({
        "target": config.target,
        "crawl": config.crawl,
        "extractor": config.extractor,
        "output": config.output,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical_json(&subset).as_bytes());
    hex::encode(hasher.finalize())
}

/// Renders a JSON value with object keys in sorted order
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let fields = sorted
                .iter()
                .map(|(k, v)| format!("{}:{}", Value::String((*k).clone()), v))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{}}}", fields)
        }
        Value::Array(items) => {
            let items = items.iter().map(canonical_json).collect::<Vec<_>>();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}
