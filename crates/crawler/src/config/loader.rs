// ABOUTME: Reads CrawlConfig from a TOML file or string layered under CARDEX_ environment variables.
// ABOUTME: A missing file is FileNotFound, bad TOML or env values are Parse; the result is validated before return.

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use super::{types::CrawlConfig, validate::validate_config, ConfigError};

/// Prefix of environment overrides; nested keys use `__`, e.g. `CARDEX_TIMEOUTS__PAGE_MS`.
pub const ENV_PREFIX: &str = "CARDEX_";

fn env_overrides() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// Load configuration from file with environment variable overrides, then validate it.
pub fn load_config(path: &Path) -> Result<CrawlConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: CrawlConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate_config(&config)?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Defaults plus environment overrides, for runs without a config file.
pub fn load_env_config() -> Result<CrawlConfig, ConfigError> {
    let config: CrawlConfig = Figment::new()
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string (useful for testing). Ignores the environment.
pub fn load_config_from_str(toml_str: &str) -> Result<CrawlConfig, ConfigError> {
    let config: CrawlConfig =
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}
