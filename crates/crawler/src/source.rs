// ABOUTME: SourceKind enum naming the three crawled origins and their search endpoints.
// ABOUTME: Provides stable site tags, fixed crawl order, and search path construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The external catalogs a crawl can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    CatalogEn,
    CatalogJp,
    PriceAggregator,
}

impl SourceKind {
    /// Every source in the fixed order a crawl visits them.
    pub const ALL: [SourceKind; 3] = [
        SourceKind::CatalogEn,
        SourceKind::CatalogJp,
        SourceKind::PriceAggregator,
    ];

    /// The `site` tag written into each record.
    pub fn tag(self) -> &'static str {
        match self {
            SourceKind::CatalogEn => "catalog-en",
            SourceKind::CatalogJp => "catalog-jp",
            SourceKind::PriceAggregator => "price-aggregator",
        }
    }

    pub fn is_catalog(self) -> bool {
        matches!(self, SourceKind::CatalogEn | SourceKind::CatalogJp)
    }

    /// Relative search path for a free-text query, percent-encoded.
    pub fn search_path(self, query: &str) -> String {
        let q = urlencoding::encode(query.trim());
        match self {
            SourceKind::CatalogEn | SourceKind::CatalogJp => format!("/search?criteria={}", q),
            SourceKind::PriceAggregator => format!("/search-products?type=prices&q={}", q),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "catalog-en" | "english" | "en" => Ok(SourceKind::CatalogEn),
            "catalog-jp" | "japanese" | "jp" => Ok(SourceKind::CatalogJp),
            "price-aggregator" | "pricecharting" => Ok(SourceKind::PriceAggregator),
            other => Err(format!("unknown source `{}`", other)),
        }
    }
}
