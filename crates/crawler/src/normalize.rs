// ABOUTME: Maps raw extractor output to canonical CardRecords.
// ABOUTME: Splits set/number composites, canonicalizes price keys, drops placeholders, and resolves release dates.

use url::Url;

use crate::dates::normalize_date;
use crate::extractors::{AggregatorItem, CatalogItem, RawCard, SetNumber};
use crate::images::is_placeholder;
use crate::record::{CardRecord, AGGREGATOR_IMAGE_KEY, CATALOG_IMAGE_KEY, UNKNOWN};
use crate::release_index::ReleaseDateIndex;
use crate::source::SourceKind;

/// Turns [`RawCard`]s into [`CardRecord`]s against a release-date index.
#[derive(Debug, Clone, Copy)]
pub struct RecordNormalizer<'a> {
    index: &'a ReleaseDateIndex,
    placeholders: &'a [String],
}

impl<'a> RecordNormalizer<'a> {
    pub fn new(index: &'a ReleaseDateIndex, placeholders: &'a [String]) -> Self {
        Self {
            index,
            placeholders,
        }
    }

    /// Normalize one raw card. Returns `None` when the item has no name.
    pub fn normalize(&self, raw: RawCard) -> Option<CardRecord> {
        match raw {
            RawCard::Catalog { source, item } => self.catalog(source, item),
            RawCard::Aggregator(item) => self.aggregator(item),
        }
    }

    fn catalog(&self, source: SourceKind, item: CatalogItem) -> Option<CardRecord> {
        let mut record = CardRecord::new(required_name(item.name, source)?, source);
        let (set_name, card_number) = resolve_set_number(item.set);
        record.release_date = if set_name == UNKNOWN {
            UNKNOWN.to_string()
        } else {
            self.index.resolve(&set_name)
        };
        record.set_name = set_name;
        record.card_number = card_number;

        for link in item.prices {
            let price = clean_price(link.price);
            record.prices.insert(canonical_price_key(&link.href), price);
        }
        if let Some(image) = self.real_image(item.image) {
            record.images.insert(CATALOG_IMAGE_KEY.to_string(), image);
        }
        Some(record)
    }

    fn aggregator(&self, item: AggregatorItem) -> Option<CardRecord> {
        let source = SourceKind::PriceAggregator;
        let mut record = CardRecord::new(required_name(item.name, source)?, source);
        let (set_name, card_number) = resolve_set_number(item.set);
        record.set_name = set_name;
        record.card_number = card_number;

        for grade in item.prices {
            let key = format!("{}/{}", item.price_host, grade.grade);
            record.prices.insert(key, clean_price(grade.price));
        }
        if let Some(image) = self.real_image(item.detail.image) {
            record.images.insert(AGGREGATOR_IMAGE_KEY.to_string(), image);
        }
        record.release_date = normalize_date(item.detail.release_date.as_deref().unwrap_or_default());
        Some(record)
    }

    fn real_image(&self, image: Option<String>) -> Option<String> {
        image
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty() && !is_placeholder(url, self.placeholders))
    }
}

fn required_name(name: Option<String>, source: SourceKind) -> Option<String> {
    let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if name.is_none() {
        tracing::debug!(site = source.tag(), "skipping listing item without a name");
    }
    name
}

fn clean_price(price: Option<String>) -> String {
    price
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn resolve_set_number(set: SetNumber) -> (String, String) {
    match set {
        SetNumber::Composite(text) => split_set_and_number(&text),
        SetNumber::Split { set, number } => {
            let set = set
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string());
            let number = number.map(|n| n.trim().to_string()).unwrap_or_default();
            (set, number)
        }
        SetNumber::Missing => (UNKNOWN.to_string(), String::new()),
    }
}

/// Split "Base Set #58" on the first `#` into `("Base Set", "58")`.
///
/// Without a `#` the whole text is the set and the number is empty. A
/// composite starting with `#` has an empty set.
pub fn split_set_and_number(composite: &str) -> (String, String) {
    let (set, number) = match composite.split_once('#') {
        Some((set, number)) => (set.trim(), number.trim()),
        None => (composite.trim(), ""),
    };
    (set.to_string(), number.to_string())
}

/// Query parameters that only carry referral or campaign tracking.
const TRACKING_PARAMS: &[&str] = &["partner", "affiliate", "affiliate_id", "ref", "campid", "customid"];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Canonical key for a marketplace link: host without `www.`, path, and
/// the query minus tracking parameters.
///
/// Vendors identify listings in the query (`?ProductId=`, `?_nkw=`), so
/// only tracking parameters and the fragment are dropped. Unparseable links
/// are used as-is.
pub fn canonical_price_key(href: &str) -> String {
    let href = href.trim();
    let Ok(url) = Url::parse(href) else {
        return href.to_string();
    };
    let Some(host) = url.host_str() else {
        return href.to_string();
    };
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = url.path().trim_end_matches('/');

    let kept: Vec<_> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .collect();
    if kept.is_empty() {
        return format!("{host}{path}");
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(kept)
        .finish();
    format!("{host}{path}?{query}")
}
