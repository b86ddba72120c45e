// ABOUTME: Runtime options for the crawler including origins, timeouts, retry policies, and transport.
// ABOUTME: CrawlerBuilder provides a fluent API for constructing Crawler instances with custom settings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::load_config;
use crate::driver::{DriverLauncher, Transport};
use crate::error::CrawlError;
use crate::extractors::rules::{AggregatorRules, CatalogRules, SetTableRules};
use crate::images::default_placeholders;
use crate::orchestrator::Crawler;
use crate::release_index::ReleaseDateIndex;
use crate::source::SourceKind;

pub const DEFAULT_CATALOG_EN_ORIGIN: &str = "https://www.pokellector.com";
pub const DEFAULT_CATALOG_JP_ORIGIN: &str = "https://jp.pokellector.com";
pub const DEFAULT_PRICE_AGGREGATOR_ORIGIN: &str = "https://www.pricecharting.com";

/// Marketplaces whose price links are kept from catalog price blocks.
pub const DEFAULT_MARKETPLACES: &[&str] = &["ebay.com", "tcgplayer.com", "trollandtoad.com"];

/// How many times a call site attempts an operation and how long it waits
/// between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub cooldown: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, cooldown: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            cooldown,
        }
    }

    /// A single attempt followed by a cooldown on failure.
    pub fn once(cooldown: Duration) -> Self {
        Self::new(1, cooldown)
    }
}

/// Base URLs of the three sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origins {
    pub catalog_en: String,
    pub catalog_jp: String,
    pub price_aggregator: String,
}

impl Origins {
    /// Origin for a source, without a trailing slash.
    pub fn for_source(&self, source: SourceKind) -> &str {
        let origin = match source {
            SourceKind::CatalogEn => &self.catalog_en,
            SourceKind::CatalogJp => &self.catalog_jp,
            SourceKind::PriceAggregator => &self.price_aggregator,
        };
        origin.trim_end_matches('/')
    }
}

impl Default for Origins {
    fn default() -> Self {
        Self {
            catalog_en: DEFAULT_CATALOG_EN_ORIGIN.to_string(),
            catalog_jp: DEFAULT_CATALOG_JP_ORIGIN.to_string(),
            price_aggregator: DEFAULT_PRICE_AGGREGATOR_ORIGIN.to_string(),
        }
    }
}

/// Chromium launch settings.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
        }
    }
}

/// Configuration options for the crawler.
#[derive(Clone)]
pub struct Options {
    pub origins: Origins,
    pub sources: Vec<SourceKind>,
    pub transport: Transport,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    /// Bound on navigation plus ready-state polling for listing pages.
    pub page_timeout: Duration,
    /// Bound on navigation plus ready-state polling for aggregator detail pages.
    pub detail_timeout: Duration,
    /// Pause after opening a search page before reading pagination links.
    pub settle_delay: Duration,
    /// Bound on the forced stop (and DOM read) after a timeout.
    pub stop_timeout: Duration,
    pub poll_interval: Duration,
    pub discovery_retry: RetryPolicy,
    pub page_retry: RetryPolicy,
    pub detail_retry: RetryPolicy,
    pub marketplaces: Vec<String>,
    pub placeholder_images: Vec<String>,
    pub catalog_rules: CatalogRules,
    pub aggregator_rules: AggregatorRules,
    pub set_rules: SetTableRules,
    pub chrome: ChromeOptions,
    pub release_table: Option<PathBuf>,
    pub release_index: Option<Arc<ReleaseDateIndex>>,
    pub launcher: Option<Arc<dyn DriverLauncher>>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("origins", &self.origins)
            .field("sources", &self.sources)
            .field("transport", &self.transport)
            .field("page_timeout", &self.page_timeout)
            .field("detail_timeout", &self.detail_timeout)
            .field("discovery_retry", &self.discovery_retry)
            .field("page_retry", &self.page_retry)
            .field("detail_retry", &self.detail_retry)
            .field("release_table", &self.release_table)
            .field("launcher", &self.launcher.as_ref().map(|_| "<launcher>"))
            .finish_non_exhaustive()
    }
}

impl Default for Options {
    fn default() -> Self {
        let cooldown = Duration::from_secs(2);
        Self {
            origins: Origins::default(),
            sources: SourceKind::ALL.to_vec(),
            transport: Transport::Chrome,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) cardex/0.1".to_string(),
            headers: HashMap::new(),
            page_timeout: Duration::from_secs(2),
            detail_timeout: Duration::from_secs(2),
            settle_delay: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
            discovery_retry: RetryPolicy::new(2, cooldown),
            page_retry: RetryPolicy::once(cooldown),
            detail_retry: RetryPolicy::once(cooldown),
            marketplaces: DEFAULT_MARKETPLACES.iter().map(|s| s.to_string()).collect(),
            placeholder_images: default_placeholders(),
            catalog_rules: CatalogRules::default(),
            aggregator_rules: AggregatorRules::default(),
            set_rules: SetTableRules::default(),
            chrome: ChromeOptions::default(),
            release_table: None,
            release_index: None,
            launcher: None,
        }
    }
}

/// Builder for constructing Crawler instances with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct CrawlerBuilder {
    opts: Options,
}

impl CrawlerBuilder {
    /// Create a new CrawlerBuilder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from fully specified options (e.g. loaded from a config file).
    pub fn from_options(opts: Options) -> Self {
        Self { opts }
    }

    /// Start from a TOML config file, with `CARDEX_` environment overrides applied.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let config = load_config(path.as_ref())?;
        Ok(Self::from_options(config.into_options()))
    }

    pub fn origins(mut self, origins: Origins) -> Self {
        self.opts.origins = origins;
        self
    }

    /// Override the origin of a single source.
    pub fn origin(mut self, source: SourceKind, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        match source {
            SourceKind::CatalogEn => self.opts.origins.catalog_en = origin,
            SourceKind::CatalogJp => self.opts.origins.catalog_jp = origin,
            SourceKind::PriceAggregator => self.opts.origins.price_aggregator = origin,
        }
        self
    }

    /// Restrict the crawl to these sources; they still run in the fixed order.
    pub fn sources(mut self, sources: impl IntoIterator<Item = SourceKind>) -> Self {
        let wanted: Vec<SourceKind> = sources.into_iter().collect();
        self.opts.sources = SourceKind::ALL
            .into_iter()
            .filter(|s| wanted.contains(s))
            .collect();
        self
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.opts.transport = transport;
        self
    }

    /// Use a custom session launcher instead of the configured transport.
    pub fn launcher(mut self, launcher: Arc<dyn DriverLauncher>) -> Self {
        self.opts.launcher = Some(launcher);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Add a custom header to all plain-HTTP requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    pub fn page_timeout(mut self, timeout: Duration) -> Self {
        self.opts.page_timeout = timeout;
        self
    }

    pub fn detail_timeout(mut self, timeout: Duration) -> Self {
        self.opts.detail_timeout = timeout;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.opts.settle_delay = delay;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.opts.stop_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.opts.poll_interval = interval;
        self
    }

    pub fn discovery_retry(mut self, policy: RetryPolicy) -> Self {
        self.opts.discovery_retry = policy;
        self
    }

    pub fn page_retry(mut self, policy: RetryPolicy) -> Self {
        self.opts.page_retry = policy;
        self
    }

    pub fn detail_retry(mut self, policy: RetryPolicy) -> Self {
        self.opts.detail_retry = policy;
        self
    }

    /// Set the same cooldown on every retry policy.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.opts.discovery_retry.cooldown = cooldown;
        self.opts.page_retry.cooldown = cooldown;
        self.opts.detail_retry.cooldown = cooldown;
        self
    }

    pub fn marketplaces<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.opts.marketplaces = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn placeholder_image(mut self, url: impl Into<String>) -> Self {
        self.opts.placeholder_images.push(url.into());
        self
    }

    pub fn catalog_rules(mut self, rules: CatalogRules) -> Self {
        self.opts.catalog_rules = rules;
        self
    }

    pub fn aggregator_rules(mut self, rules: AggregatorRules) -> Self {
        self.opts.aggregator_rules = rules;
        self
    }

    pub fn set_rules(mut self, rules: SetTableRules) -> Self {
        self.opts.set_rules = rules;
        self
    }

    pub fn chrome(mut self, chrome: ChromeOptions) -> Self {
        self.opts.chrome = chrome;
        self
    }

    /// Path of the release-date CSV, loaded when the crawler is built.
    pub fn release_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.opts.release_table = Some(path.into());
        self
    }

    /// Use an already loaded release-date index.
    pub fn release_index(mut self, index: ReleaseDateIndex) -> Self {
        self.opts.release_index = Some(Arc::new(index));
        self
    }

    /// Build the Crawler. Fails when the release table cannot be loaded.
    pub fn build(self) -> Result<Crawler, CrawlError> {
        Crawler::new(self.opts)
    }
}
