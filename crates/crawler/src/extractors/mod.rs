// ABOUTME: Per-source extraction of raw card fields from rendered listing pages.
// ABOUTME: Defines the RawCard sum type that the record normalizer turns into CardRecords.

//! Source extractors.
//!
//! Each source has one extractor that reads a parsed listing page and yields
//! one [`RawCard`] per listing item. Extractors never fail: a missing
//! sub-element leaves the corresponding field absent and the normalizer fills
//! in the unknown sentinel.
//!
//! Submodules:
//! - `catalog`: catalog search results (both languages).
//! - `aggregator`: price-aggregator product table plus detail-page enrichment.
//! - `rules`: configurable selectors for every source.
//! - `select` / `compiled`: scraper helpers over a shared selector cache.

pub mod aggregator;
pub mod catalog;
pub mod compiled;
pub mod rules;
pub mod select;

use scraper::Html;

use crate::source::SourceKind;

pub use aggregator::{AggregatorExtractor, DetailFields};
pub use catalog::CatalogExtractor;

/// How a listing reported the set and card number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetNumber {
    /// A single "Set Name #Number" string still to be split.
    Composite(String),
    /// Already separate fields.
    Split {
        set: Option<String>,
        number: Option<String>,
    },
    Missing,
}

/// A marketplace price link from a catalog price block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLink {
    pub href: String,
    /// Displayed price text, `None` when the link shows no price.
    pub price: Option<String>,
}

/// Raw fields of one catalog listing item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub name: Option<String>,
    pub set: SetNumber,
    pub prices: Vec<PriceLink>,
    pub image: Option<String>,
}

/// One graded price cell from an aggregator row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradePrice {
    pub grade: String,
    pub price: Option<String>,
}

/// Raw fields of one aggregator product row, plus detail-page enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorItem {
    pub name: Option<String>,
    pub set: SetNumber,
    pub prices: Vec<GradePrice>,
    /// Host used to key the graded prices, e.g. `pricecharting.com`.
    pub price_host: String,
    pub detail_url: Option<String>,
    pub detail: DetailFields,
}

/// Raw listing output, tagged by the kind of source that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCard {
    Catalog {
        source: SourceKind,
        item: CatalogItem,
    },
    Aggregator(AggregatorItem),
}

impl RawCard {
    pub fn source(&self) -> SourceKind {
        match self {
            RawCard::Catalog { source, .. } => *source,
            RawCard::Aggregator(_) => SourceKind::PriceAggregator,
        }
    }
}

/// Common contract of the listing extractors.
pub trait SourceExtractor {
    /// Extract one raw card per listing item, in document order.
    fn extract(&self, doc: &Html, page_url: &str, source: SourceKind) -> Vec<RawCard>;
}

/// Host of a URL without a leading `www.`, lowercased.
pub(crate) fn bare_host(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}
