// ABOUTME: Configurable CSS selector rules for each source's listing and detail pages.
// ABOUTME: Defaults match the live site markup; any field can be overridden from a config file.

//! Extraction rules.
//!
//! Each source is described by a small set of selectors rather than code, so a
//! markup change on one site is a config edit. Rules deserialize with
//! `#[serde(default)]`, meaning a config file only names the selectors it
//! overrides.

use serde::{Deserialize, Serialize};

/// Selectors for catalog search-result listings (both languages share markup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRules {
    /// One element per card in the listing.
    pub item: String,
    pub name: String,
    /// Element holding the "Set #Number" text.
    pub set: String,
    /// Container of marketplace price links.
    pub prices: String,
    /// Links inside the price container.
    pub price_link: String,
    /// The card image inside an item.
    pub image: String,
    /// Decorative children of a price link whose text is ignored.
    pub price_icon: String,
}

impl Default for CatalogRules {
    fn default() -> Self {
        Self {
            item: "div.cardresult".to_string(),
            name: "div.name".to_string(),
            set: "div.set".to_string(),
            prices: "div.prices".to_string(),
            price_link: "a[href]".to_string(),
            image: "img.card".to_string(),
            price_icon: "img, i, svg".to_string(),
        }
    }
}

/// One graded price column of the aggregator's product table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceColumn {
    /// Cell selector within a row.
    pub selector: String,
    /// Grade label used in the price key, e.g. `ungraded`.
    pub grade: String,
}

impl PriceColumn {
    fn new(selector: &str, grade: &str) -> Self {
        Self {
            selector: selector.to_string(),
            grade: grade.to_string(),
        }
    }
}

/// Selectors for the price aggregator's product table and detail pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorRules {
    /// One element per product row.
    pub row: String,
    /// Title link of a row; its text is "Name #Number" and its href the detail page.
    pub title: String,
    /// Cell naming the set.
    pub set: String,
    pub price_columns: Vec<PriceColumn>,
    /// Attribute table rows on a detail page.
    pub detail_attribute_row: String,
    pub detail_label: String,
    pub detail_value: String,
    /// Label of the attribute row carrying the release date.
    pub release_label: String,
    /// Image selectors on a detail page, tried in order.
    pub detail_image: Vec<String>,
}

impl Default for AggregatorRules {
    fn default() -> Self {
        Self {
            row: "tr[id^='product-']".to_string(),
            title: "td.title a".to_string(),
            set: "td.console".to_string(),
            price_columns: vec![
                PriceColumn::new("td.used_price", "ungraded"),
                PriceColumn::new("td.cib_price", "grade-7"),
                PriceColumn::new("td.new_price", "grade-8"),
            ],
            detail_attribute_row: "#attribute tr".to_string(),
            detail_label: "td.title".to_string(),
            detail_value: "td.details".to_string(),
            release_label: "Release Date".to_string(),
            detail_image: vec![
                "#product_details .cover img".to_string(),
                "#product_details img".to_string(),
            ],
        }
    }
}

/// Selectors for the catalog's set index and per-set pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetTableRules {
    /// Path of the set index page.
    pub index_path: String,
    /// Links to individual set pages on the index.
    pub set_link: String,
    /// Breadcrumb container on a set page: category, series, set.
    pub breadcrumbs: String,
    /// Set information block; the selectors below are scoped to it.
    pub setinfo: String,
    pub description: String,
    /// Card counts: the second `span` is the count, a `cite` holds the secret count.
    pub counts: String,
    /// Blocks within the set info; the last one carries the release date.
    pub release_block: String,
}

impl Default for SetTableRules {
    fn default() -> Self {
        Self {
            index_path: "/sets".to_string(),
            set_link: "#columnLeft a[href]".to_string(),
            breadcrumbs: ".breadcrumbs".to_string(),
            setinfo: ".setinfo".to_string(),
            description: ".description".to_string(),
            counts: ".cards".to_string(),
            release_block: "div".to_string(),
        }
    }
}

impl CatalogRules {
    pub(crate) fn selectors(&self) -> Vec<&str> {
        vec![
            self.item.as_str(),
            self.name.as_str(),
            self.set.as_str(),
            self.prices.as_str(),
            self.price_link.as_str(),
            self.image.as_str(),
            self.price_icon.as_str(),
        ]
    }
}

impl AggregatorRules {
    pub(crate) fn selectors(&self) -> Vec<&str> {
        let mut all: Vec<&str> = vec![
            self.row.as_str(),
            self.title.as_str(),
            self.set.as_str(),
            self.detail_attribute_row.as_str(),
            self.detail_label.as_str(),
            self.detail_value.as_str(),
        ];
        all.extend(self.price_columns.iter().map(|c| c.selector.as_str()));
        all.extend(self.detail_image.iter().map(String::as_str));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::compiled::get_or_compile;

    #[test]
    fn default_selectors_all_compile() {
        let catalog = CatalogRules::default();
        let aggregator = AggregatorRules::default();
        let sets = SetTableRules::default();
        for css in catalog.selectors().into_iter().chain(aggregator.selectors()) {
            assert!(get_or_compile(css).is_some(), "selector failed: {css}");
        }
        for css in [
            &sets.set_link,
            &sets.breadcrumbs,
            &sets.setinfo,
            &sets.description,
            &sets.counts,
            &sets.release_block,
        ] {
            assert!(get_or_compile(css).is_some(), "selector failed: {css}");
        }
    }

    #[test]
    fn partial_rules_fill_in_defaults() {
        let rules: CatalogRules = serde_json::from_str(r#"{"item": "li.card"}"#).unwrap();
        assert_eq!(rules.item, "li.card");
        assert_eq!(rules.name, "div.name");

        let rules: AggregatorRules =
            serde_json::from_str(r#"{"price_columns": [{"selector": "td.used_price", "grade": "loose"}]}"#)
                .unwrap();
        assert_eq!(rules.price_columns.len(), 1);
        assert_eq!(rules.price_columns[0].grade, "loose");
        assert_eq!(rules.release_label, "Release Date");
    }
}
