// ABOUTME: Crawls the catalog set index to rebuild the release-date table.
// ABOUTME: Produces one SetInfo per set page and writes them as the CSV the ReleaseDateIndex reads.

use std::io;
use std::sync::Arc;

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::driver::{launcher_for, DriverLauncher};
use crate::error::CrawlError;
use crate::extractors::rules::SetTableRules;
use crate::extractors::select::{attr, element_text, first_text, select_all, select_first};
use crate::fetcher::PageFetcher;
use crate::options::Options;
use crate::record::UNKNOWN;
use crate::session::Session;
use crate::source::SourceKind;

/// One row of the set table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetInfo {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Series")]
    pub series: String,
    #[serde(rename = "SetName")]
    pub set_name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Card Count")]
    pub card_count: String,
    #[serde(rename = "Secret Card Count")]
    pub secret_card_count: String,
    /// Raw text as shown on the site, e.g. `Jan 17th 2024`.
    #[serde(rename = "Release Date")]
    pub release_date: String,
}

impl SetInfo {
    /// A row for a set page that could not be read.
    pub fn unknown(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            category: UNKNOWN.to_string(),
            series: UNKNOWN.to_string(),
            set_name: UNKNOWN.to_string(),
            description: UNKNOWN.to_string(),
            card_count: UNKNOWN.to_string(),
            secret_card_count: UNKNOWN.to_string(),
            release_date: UNKNOWN.to_string(),
        }
    }
}

/// Absolute links to every set page on a set index page, deduplicated in order.
pub fn set_links(doc: &Html, page_url: &str, rules: &SetTableRules) -> Vec<String> {
    let Ok(base) = url::Url::parse(page_url) else {
        return Vec::new();
    };
    let mut links: Vec<String> = Vec::new();
    for link in select_all(doc.root_element(), &rules.set_link) {
        let Some(resolved) = attr(link, "href").and_then(|href| base.join(&href).ok()) else {
            continue;
        };
        let resolved = resolved.to_string();
        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }
    links
}

/// Read one set page. Missing pieces become the unknown sentinel.
pub fn parse_set_page(doc: &Html, url: &str, rules: &SetTableRules) -> SetInfo {
    let root = doc.root_element();
    let mut info = SetInfo::unknown(url);

    let crumbs = breadcrumbs(doc, rules);
    let mut crumbs = crumbs.into_iter();
    if let Some(category) = crumbs.next() {
        info.category = category;
    }
    if let Some(series) = crumbs.next() {
        info.series = series;
    }
    if let Some(set_name) = crumbs.next() {
        info.set_name = set_name;
    }

    let Some(setinfo) = select_first(root, &rules.setinfo) else {
        return info;
    };
    if let Some(description) = first_text(setinfo, &rules.description) {
        info.description = description;
    }

    if let Some(cards) = select_first(setinfo, &rules.counts) {
        if let Some(count) = select_all(cards, "span").get(1).map(|s| element_text(*s)) {
            if !count.is_empty() {
                info.card_count = count;
            }
        }
        if let Some(secret) = first_text(cards, "cite") {
            let secret = secret.replace('+', "").replace("Secret", "");
            let secret = secret.trim();
            if !secret.is_empty() {
                info.secret_card_count = secret.to_string();
            }
        }
    }

    if let Some(block) = select_all(setinfo, &rules.release_block).last().copied() {
        let day = select_all(block, "span").get(1).map(|s| element_text(*s));
        let year = first_text(block, "cite");
        if let (Some(day), Some(year)) = (day, year) {
            if !day.is_empty() {
                info.release_date = format!("{day} {year}");
            }
        }
    }

    info
}

/// Breadcrumb texts, plus the trailing unlinked segment after the last `»`.
fn breadcrumbs(doc: &Html, rules: &SetTableRules) -> Vec<String> {
    let Some(container) = select_first(doc.root_element(), &rules.breadcrumbs) else {
        return Vec::new();
    };
    let mut crumbs: Vec<String> = select_all(container, "a")
        .into_iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    let full = element_text(container);
    if let Some(last) = full.rsplit('»').next().map(str::trim) {
        if !last.is_empty() && !crumbs.iter().any(|c| c == last) {
            crumbs.push(last.to_string());
        }
    }
    crumbs
}

/// Write sets as CSV with the headers the release-date index expects.
pub fn write_set_table<W: io::Write>(writer: W, sets: &[SetInfo]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for set in sets {
        wtr.serialize(set)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Visits the set index of each catalog origin and every set page it links.
pub struct SetCatalogCrawler {
    opts: Options,
    launcher: Arc<dyn DriverLauncher>,
    fetcher: PageFetcher,
}

impl SetCatalogCrawler {
    pub fn new(opts: Options) -> Self {
        let launcher = opts.launcher.clone().unwrap_or_else(|| launcher_for(&opts));
        Self {
            fetcher: PageFetcher::from_options(&opts),
            launcher,
            opts,
        }
    }

    /// Crawl the Japanese catalog first, then the English one.
    pub async fn run(&self) -> Result<Vec<SetInfo>, CrawlError> {
        let mut session = Session::open(self.launcher.as_ref(), "sets")
            .await
            .map_err(CrawlError::Session)?;
        let rules = &self.opts.set_rules;
        let mut sets = Vec::new();

        for source in [SourceKind::CatalogJp, SourceKind::CatalogEn] {
            let origin = self.opts.origins.for_source(source);
            let index = match self
                .fetcher
                .load_page(&mut *session, origin, &rules.index_path)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(site = source.tag(), error = %e, "set index unavailable");
                    continue;
                }
            };
            let links = set_links(&index.document(), &index.url, rules);
            tracing::info!(site = source.tag(), sets = links.len(), "set index read");

            for link in links {
                let info = match self
                    .fetcher
                    .load_url(&mut *session, &link, self.fetcher.page_timeout, self.fetcher.page_retry)
                    .await
                {
                    Ok(page) => parse_set_page(&page.document(), &link, rules),
                    Err(e) => {
                        tracing::warn!(url = %link, error = %e, "set page unavailable");
                        SetInfo::unknown(&link)
                    }
                };
                tracing::debug!(url = %link, set = %info.set_name, release = %info.release_date, "set read");
                sets.push(info);
            }
        }

        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "set session did not close cleanly");
        }
        Ok(sets)
    }
}
