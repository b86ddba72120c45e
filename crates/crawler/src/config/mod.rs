// ABOUTME: File-based crawler configuration: TOML with CARDEX_ environment overrides.
// ABOUTME: Loads, validates, and converts a CrawlConfig into runtime Options.

mod loader;
mod types;
mod validate;

pub use crate::error::ConfigError;
pub use loader::{load_config, load_config_from_str, load_env_config, ENV_PREFIX};
pub use types::*;
pub use validate::validate_config;
