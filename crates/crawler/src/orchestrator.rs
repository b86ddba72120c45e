// ABOUTME: The Crawler that fans a batch of card names out over every enabled source.
// ABOUTME: Owns the release-date index and the page sessions; only construction and session launch can fail.

use std::sync::Arc;

use tracing::Instrument;

use crate::driver::{launcher_for, DriverLauncher};
use crate::error::CrawlError;
use crate::extractors::compiled::precompile_selectors;
use crate::extractors::{AggregatorExtractor, CatalogExtractor, RawCard, SourceExtractor};
use crate::fetcher::{PageFetcher, RenderedPage, PAGINATION_SELECTOR};
use crate::normalize::RecordNormalizer;
use crate::options::{CrawlerBuilder, Options};
use crate::record::{CardRecord, CrawlReport, SourceStats};
use crate::release_index::ReleaseDateIndex;
use crate::session::Session;
use crate::source::SourceKind;

/// What one source contributed for one name.
#[derive(Debug, Default)]
struct SourceOutcome {
    records: Vec<CardRecord>,
    stats: SourceStats,
}

/// Crawls the catalog and price sources for card names.
///
/// Catalog sources share one page session and the price aggregator uses a
/// second, so the two families run concurrently for each name. Page-level
/// failures never surface here: a page that cannot be loaded contributes
/// nothing and the crawl moves on.
pub struct Crawler {
    opts: Options,
    index: Arc<ReleaseDateIndex>,
    launcher: Arc<dyn DriverLauncher>,
    fetcher: PageFetcher,
}

impl Crawler {
    /// Create a new CrawlerBuilder for configuring the crawler.
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::new()
    }

    /// Create a Crawler, loading the release table if one is configured.
    pub fn new(opts: Options) -> Result<Self, CrawlError> {
        let index = match (&opts.release_index, &opts.release_table) {
            (Some(index), _) => Arc::clone(index),
            (None, Some(path)) => Arc::new(ReleaseDateIndex::from_path(path)?),
            (None, None) => {
                tracing::warn!("no release table configured, catalog release dates will be unknown");
                Arc::new(ReleaseDateIndex::default())
            }
        };
        let launcher = opts
            .launcher
            .clone()
            .unwrap_or_else(|| launcher_for(&opts));

        let invalid = precompile_selectors(
            opts.catalog_rules
                .selectors()
                .into_iter()
                .chain(opts.aggregator_rules.selectors())
                .chain([PAGINATION_SELECTOR]),
        );
        if !invalid.is_empty() {
            tracing::warn!(selectors = ?invalid, "some extraction rules will never match");
        }

        Ok(Self {
            fetcher: PageFetcher::from_options(&opts),
            opts,
            index,
            launcher,
        })
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub fn index(&self) -> &ReleaseDateIndex {
        &self.index
    }

    /// Crawl a comma-separated batch of names.
    pub async fn run(&self, names: &str) -> Result<CrawlReport, CrawlError> {
        self.run_names(&split_names(names)).await
    }

    /// Crawl each name in turn. Records come out per name in source order
    /// catalog-en, catalog-jp, price-aggregator.
    pub async fn run_names(&self, names: &[String]) -> Result<CrawlReport, CrawlError> {
        let mut report = CrawlReport::default();
        for source in &self.opts.sources {
            report.stats_mut(*source);
        }
        if names.is_empty() {
            return Ok(report);
        }

        let wants_catalog = self.opts.sources.iter().any(|s| s.is_catalog());
        let wants_aggregator = self.opts.sources.contains(&SourceKind::PriceAggregator);

        let mut catalog_session = if wants_catalog {
            Some(self.open_session("catalog").await?)
        } else {
            None
        };
        let mut aggregator_session = None;
        if wants_aggregator {
            match self.open_session("price-aggregator").await {
                Ok(session) => aggregator_session = Some(session),
                Err(e) => {
                    if let Some(session) = catalog_session.take() {
                        let label = session.label();
                        if let Err(close_err) = session.close().await {
                            tracing::warn!(session = label, error = %close_err, "session did not close cleanly");
                        }
                    }
                    return Err(e);
                }
            }
        }

        for name in names {
            let span = tracing::info_span!("crawl", name = %name);
            let (catalogs, aggregator) = async {
                tokio::join!(
                    self.crawl_catalogs(catalog_session.as_mut(), name),
                    self.crawl_aggregator(aggregator_session.as_mut(), name),
                )
            }
            .instrument(span)
            .await;

            for (source, outcome) in catalogs.into_iter().chain(aggregator) {
                let stats = report.stats_mut(source);
                stats.pages_discovered += outcome.stats.pages_discovered;
                stats.pages_loaded += outcome.stats.pages_loaded;
                stats.pages_skipped += outcome.stats.pages_skipped;
                stats.records += outcome.stats.records;
                report.records.extend(outcome.records);
            }
        }

        for session in [catalog_session, aggregator_session].into_iter().flatten() {
            let label = session.label();
            if let Err(e) = session.close().await {
                tracing::warn!(session = label, error = %e, "session did not close cleanly");
            }
        }

        tracing::info!(names = names.len(), records = report.len(), "crawl finished");
        Ok(report)
    }

    /// Extract and normalize records from an already rendered listing page.
    ///
    /// Aggregator rows are returned without detail-page enrichment.
    pub fn extract_html(&self, source: SourceKind, html: &str, page_url: &str) -> Vec<CardRecord> {
        let page = RenderedPage {
            url: page_url.to_string(),
            html: html.to_string(),
            complete: true,
        };
        let normalizer = RecordNormalizer::new(&self.index, &self.opts.placeholder_images);
        self.extract(source, &page)
            .into_iter()
            .filter_map(|raw| normalizer.normalize(raw))
            .collect()
    }

    async fn open_session(&self, label: &'static str) -> Result<Session, CrawlError> {
        Session::open(self.launcher.as_ref(), label)
            .await
            .map_err(CrawlError::Session)
    }

    async fn crawl_catalogs(
        &self,
        session: Option<&mut Session>,
        name: &str,
    ) -> Vec<(SourceKind, SourceOutcome)> {
        let Some(session) = session else {
            return Vec::new();
        };
        let mut outcomes = Vec::new();
        for source in self.opts.sources.iter().copied().filter(|s| s.is_catalog()) {
            let outcome = self.crawl_source(session, source, name).await;
            outcomes.push((source, outcome));
        }
        outcomes
    }

    async fn crawl_aggregator(
        &self,
        session: Option<&mut Session>,
        name: &str,
    ) -> Option<(SourceKind, SourceOutcome)> {
        let session = session?;
        let source = SourceKind::PriceAggregator;
        Some((source, self.crawl_source(session, source, name).await))
    }

    async fn crawl_source(&self, session: &mut Session, source: SourceKind, name: &str) -> SourceOutcome {
        let span = tracing::info_span!("source", site = source.tag());
        async {
            let origin = self.opts.origins.for_source(source);
            let mut outcome = SourceOutcome::default();
            let paths = self
                .fetcher
                .discover_pagination_paths(&mut **session, origin, source, name)
                .await;
            outcome.stats.pages_discovered = paths.len();

            for path in &paths {
                let page = match self.fetcher.load_page(&mut **session, origin, path).await {
                    Ok(page) => page,
                    Err(e) => {
                        outcome.stats.pages_skipped += 1;
                        tracing::warn!(path = %path, error = %e, "skipping page");
                        continue;
                    }
                };
                outcome.stats.pages_loaded += 1;

                let mut raw = self.extract(source, &page);
                if source == SourceKind::PriceAggregator {
                    self.aggregator_extractor()
                        .enrich_details(&self.fetcher, &mut **session, &mut raw)
                        .await;
                }
                let normalizer = RecordNormalizer::new(&self.index, &self.opts.placeholder_images);
                let before = outcome.records.len();
                outcome
                    .records
                    .extend(raw.into_iter().filter_map(|r| normalizer.normalize(r)));
                tracing::debug!(url = %page.url, records = outcome.records.len() - before, "page extracted");
            }

            outcome.stats.records = outcome.records.len();
            tracing::info!(pages = paths.len(), records = outcome.stats.records, "source crawled");
            outcome
        }
        .instrument(span)
        .await
    }

    fn aggregator_extractor(&self) -> AggregatorExtractor<'_> {
        AggregatorExtractor::new(
            &self.opts.aggregator_rules,
            &self.opts.placeholder_images,
            self.opts.origins.for_source(SourceKind::PriceAggregator),
        )
    }

    fn extract(&self, source: SourceKind, page: &RenderedPage) -> Vec<RawCard> {
        let doc = page.document();
        match source {
            SourceKind::CatalogEn | SourceKind::CatalogJp => CatalogExtractor::new(
                &self.opts.catalog_rules,
                &self.opts.marketplaces,
                &self.opts.placeholder_images,
            )
            .extract(&doc, &page.url, source),
            SourceKind::PriceAggregator => self.aggregator_extractor().extract(&doc, &page.url, source),
        }
    }
}

/// Split a comma-separated batch into trimmed, non-empty names.
pub fn split_names(batch: &str) -> Vec<String> {
    batch
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
