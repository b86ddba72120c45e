// ABOUTME: CardRecord struct holding one canonical trading-card row produced by a crawl.
// ABOUTME: Includes the unknown sentinel, image source keys, and the CrawlReport returned to callers.

use std::io;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::source::SourceKind;

/// Placeholder substituted whenever a field cannot be determined.
pub const UNKNOWN: &str = "unknown";

/// Image-source key for pictures scraped from the catalog sites.
pub const CATALOG_IMAGE_KEY: &str = "catalog";

/// Image-source key for pictures scraped from the price aggregator.
pub const AGGREGATOR_IMAGE_KEY: &str = "price-aggregator";

/// The canonical, source-agnostic card record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub name: String,
    pub set_name: String,
    pub card_number: String,
    /// Price-source key -> displayed price (or the unknown sentinel).
    pub prices: IndexMap<String, String>,
    /// Image-source key -> absolute image URL.
    pub images: IndexMap<String, String>,
    pub site: String,
    /// `YYYY-MM-DD` or the unknown sentinel.
    pub release_date: String,
}

impl CardRecord {
    /// Creates a record with empty price/image maps and unknown set and date.
    pub fn new(name: impl Into<String>, site: SourceKind) -> Self {
        Self {
            name: name.into(),
            set_name: UNKNOWN.to_string(),
            card_number: String::new(),
            prices: IndexMap::new(),
            images: IndexMap::new(),
            site: site.tag().to_string(),
            release_date: UNKNOWN.to_string(),
        }
    }

    /// Returns true when the release date resolved to a real date.
    pub fn has_release_date(&self) -> bool {
        self.release_date != UNKNOWN
    }
}

/// Per-source tallies collected while a crawl runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub pages_discovered: usize,
    pub pages_loaded: usize,
    pub pages_skipped: usize,
    pub records: usize,
}

/// The outcome of a crawl run: every record in output order plus statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub records: Vec<CardRecord>,
    pub stats: IndexMap<String, SourceStats>,
}

impl CrawlReport {
    /// True when the batch found no data at all ("no data found").
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn stats_mut(&mut self, site: SourceKind) -> &mut SourceStats {
        self.stats.entry(site.tag().to_string()).or_default()
    }

    pub fn into_records(self) -> Vec<CardRecord> {
        self.records
    }
}

/// One CSV row of the record export; the maps are embedded as JSON objects.
#[derive(Serialize)]
struct RecordRow<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Images")]
    images: String,
    #[serde(rename = "Set")]
    set_name: &'a str,
    #[serde(rename = "Card Number")]
    card_number: &'a str,
    #[serde(rename = "Prices")]
    prices: String,
    #[serde(rename = "Site")]
    site: &'a str,
    #[serde(rename = "Release Date")]
    release_date: &'a str,
}

/// Write records as CSV with `Name, Images, Set, Card Number, Prices, Site, Release Date` columns.
pub fn write_record_table<W: io::Write>(writer: W, records: &[CardRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(RecordRow {
            name: &record.name,
            images: json_object(&record.images)?,
            set_name: &record.set_name,
            card_number: &record.card_number,
            prices: json_object(&record.prices)?,
            site: &record.site,
            release_date: &record.release_date,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn json_object(map: &IndexMap<String, String>) -> Result<String, csv::Error> {
    serde_json::to_string(map).map_err(|e| csv::Error::from(io::Error::other(e)))
}
