// ABOUTME: Sanity checks for a loaded CrawlConfig before it becomes Options.
// ABOUTME: Origins must be absolute http(s) URLs; retry counts and timeouts must be non-zero.

use url::Url;

use super::{types::CrawlConfig, ConfigError};

/// Validate configuration.
///
/// Checks that every origin is an absolute http(s) URL, every retry policy
/// makes at least one attempt, at least one source is enabled, and the
/// load timeouts and poll interval are non-zero.
pub fn validate_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let origins = [
        ("origins.catalog_en", &config.origins.catalog_en),
        ("origins.catalog_jp", &config.origins.catalog_jp),
        ("origins.price_aggregator", &config.origins.price_aggregator),
    ];
    for (key, origin) in origins {
        let parsed = Url::parse(origin)
            .map_err(|e| ConfigError::Validation(format!("{key} `{origin}` is not a URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConfigError::Validation(format!(
                "{key} `{origin}` must be an absolute http(s) URL"
            )));
        }
    }

    let retries = [
        ("retries.discovery", config.retries.discovery),
        ("retries.page", config.retries.page),
        ("retries.detail", config.retries.detail),
    ];
    for (key, attempts) in retries {
        if attempts == 0 {
            return Err(ConfigError::Validation(format!("{key} must be at least 1")));
        }
    }

    if config.sources.is_empty() {
        return Err(ConfigError::Validation(
            "sources must name at least one source".to_string(),
        ));
    }

    let timeouts = [
        ("timeouts.page_ms", config.timeouts.page_ms),
        ("timeouts.detail_ms", config.timeouts.detail_ms),
        ("timeouts.stop_ms", config.timeouts.stop_ms),
        ("timeouts.poll_ms", config.timeouts.poll_ms),
    ];
    for (key, ms) in timeouts {
        if ms == 0 {
            return Err(ConfigError::Validation(format!("{key} cannot be 0")));
        }
    }

    Ok(())
}
