// ABOUTME: Serde types for the cardex config file, one struct per TOML section.
// ABOUTME: Every section has defaults, and CrawlConfig converts into runtime Options.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::Transport;
use crate::extractors::rules::{AggregatorRules, CatalogRules, SetTableRules};
use crate::images::default_placeholders;
use crate::options::{
    ChromeOptions, Options, Origins, RetryPolicy, DEFAULT_CATALOG_EN_ORIGIN,
    DEFAULT_CATALOG_JP_ORIGIN, DEFAULT_MARKETPLACES, DEFAULT_PRICE_AGGREGATOR_ORIGIN,
};
use crate::source::SourceKind;

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// CSV with `SetName` and `Release Date` columns.
    pub release_table: Option<PathBuf>,
    pub transport: Transport,
    pub sources: Vec<SourceKind>,
    pub user_agent: Option<String>,
    pub marketplaces: Vec<String>,
    /// Extra placeholder image URLs, on top of the built-in list.
    pub placeholder_images: Vec<String>,
    pub origins: OriginsConfig,
    pub timeouts: TimeoutsConfig,
    pub retries: RetriesConfig,
    pub chrome: ChromeConfig,
    pub catalog_rules: CatalogRules,
    pub aggregator_rules: AggregatorRules,
    pub set_rules: SetTableRules,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            release_table: None,
            transport: Transport::default(),
            sources: SourceKind::ALL.to_vec(),
            user_agent: None,
            marketplaces: DEFAULT_MARKETPLACES.iter().map(|s| s.to_string()).collect(),
            placeholder_images: Vec::new(),
            origins: OriginsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            retries: RetriesConfig::default(),
            chrome: ChromeConfig::default(),
            catalog_rules: CatalogRules::default(),
            aggregator_rules: AggregatorRules::default(),
            set_rules: SetTableRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginsConfig {
    pub catalog_en: String,
    pub catalog_jp: String,
    pub price_aggregator: String,
}

impl Default for OriginsConfig {
    fn default() -> Self {
        Self {
            catalog_en: DEFAULT_CATALOG_EN_ORIGIN.to_string(),
            catalog_jp: DEFAULT_CATALOG_JP_ORIGIN.to_string(),
            price_aggregator: DEFAULT_PRICE_AGGREGATOR_ORIGIN.to_string(),
        }
    }
}

/// All durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub page_ms: u64,
    pub detail_ms: u64,
    pub settle_ms: u64,
    pub stop_ms: u64,
    pub poll_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            page_ms: 2_000,
            detail_ms: 2_000,
            settle_ms: 1_000,
            stop_ms: 1_000,
            poll_ms: 100,
            cooldown_ms: 2_000,
        }
    }
}

/// Attempts per call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetriesConfig {
    pub discovery: u32,
    pub page: u32,
    pub detail: u32,
}

impl Default for RetriesConfig {
    fn default() -> Self {
        Self {
            discovery: 2,
            page: 1,
            detail: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeConfig {
    pub headless: bool,
    pub executable: Option<PathBuf>,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
        }
    }
}

impl CrawlConfig {
    /// Convert to runtime options. Call [`validate_config`](super::validate_config) first.
    pub fn into_options(self) -> Options {
        let defaults = Options::default();
        let cooldown = Duration::from_millis(self.timeouts.cooldown_ms);
        let mut placeholder_images = default_placeholders();
        placeholder_images.extend(self.placeholder_images);

        Options {
            origins: Origins {
                catalog_en: self.origins.catalog_en,
                catalog_jp: self.origins.catalog_jp,
                price_aggregator: self.origins.price_aggregator,
            },
            sources: SourceKind::ALL
                .into_iter()
                .filter(|s| self.sources.contains(s))
                .collect(),
            transport: self.transport,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            page_timeout: Duration::from_millis(self.timeouts.page_ms),
            detail_timeout: Duration::from_millis(self.timeouts.detail_ms),
            settle_delay: Duration::from_millis(self.timeouts.settle_ms),
            stop_timeout: Duration::from_millis(self.timeouts.stop_ms),
            poll_interval: Duration::from_millis(self.timeouts.poll_ms),
            discovery_retry: RetryPolicy::new(self.retries.discovery, cooldown),
            page_retry: RetryPolicy::new(self.retries.page, cooldown),
            detail_retry: RetryPolicy::new(self.retries.detail, cooldown),
            marketplaces: self.marketplaces,
            placeholder_images,
            catalog_rules: self.catalog_rules,
            aggregator_rules: self.aggregator_rules,
            set_rules: self.set_rules,
            chrome: ChromeOptions {
                headless: self.chrome.headless,
                executable: self.chrome.executable,
            },
            release_table: self.release_table,
            ..defaults
        }
    }
}
