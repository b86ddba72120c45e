// ABOUTME: Extractor for catalog search-result listings in both catalog languages.
// ABOUTME: Reads name, "Set #Number" text, allowed marketplace price links, and the card image.

use scraper::{ElementRef, Html};

use crate::extractors::rules::CatalogRules;
use crate::extractors::select::{attr, first_text, select_all, select_first, text_excluding};
use crate::extractors::{bare_host, CatalogItem, PriceLink, RawCard, SetNumber, SourceExtractor};
use crate::images::accept_image;
use crate::source::SourceKind;

/// Extracts [`CatalogItem`]s from a catalog search page.
#[derive(Debug, Clone, Copy)]
pub struct CatalogExtractor<'a> {
    rules: &'a CatalogRules,
    marketplaces: &'a [String],
    placeholders: &'a [String],
}

impl<'a> CatalogExtractor<'a> {
    pub fn new(rules: &'a CatalogRules, marketplaces: &'a [String], placeholders: &'a [String]) -> Self {
        Self {
            rules,
            marketplaces,
            placeholders,
        }
    }

    fn item(&self, el: ElementRef<'_>, page_url: &str) -> CatalogItem {
        let set = match first_text(el, &self.rules.set) {
            Some(text) => SetNumber::Composite(text),
            None => SetNumber::Missing,
        };
        CatalogItem {
            name: first_text(el, &self.rules.name),
            set,
            prices: self.price_links(el),
            image: self.image(el, page_url),
        }
    }

    fn price_links(&self, el: ElementRef<'_>) -> Vec<PriceLink> {
        let Some(block) = select_first(el, &self.rules.prices) else {
            return Vec::new();
        };
        select_all(block, &self.rules.price_link)
            .into_iter()
            .filter_map(|link| {
                let href = attr(link, "href")?;
                if !is_allowed_marketplace(&href, self.marketplaces) {
                    tracing::trace!(href = %href, "skipping price link outside the marketplace allow-list");
                    return None;
                }
                let price = text_excluding(link, &self.rules.price_icon);
                Some(PriceLink {
                    href,
                    price: (!price.is_empty()).then_some(price),
                })
            })
            .collect()
    }

    fn image(&self, el: ElementRef<'_>, page_url: &str) -> Option<String> {
        let img = select_first(el, &self.rules.image)?;
        // Lazy-loaded listings keep the real scan in data-src until scrolled into view
        ["src", "data-src"]
            .into_iter()
            .filter_map(|name| attr(img, name))
            .find_map(|src| accept_image(&src, Some(page_url), self.placeholders))
    }
}

impl SourceExtractor for CatalogExtractor<'_> {
    fn extract(&self, doc: &Html, page_url: &str, source: SourceKind) -> Vec<RawCard> {
        select_all(doc.root_element(), &self.rules.item)
            .into_iter()
            .map(|el| RawCard::Catalog {
                source,
                item: self.item(el, page_url),
            })
            .collect()
    }
}

/// True when the link's host is one of `allowed` or a subdomain of one.
pub fn is_allowed_marketplace(href: &str, allowed: &[String]) -> bool {
    let Some(host) = bare_host(href) else {
        return false;
    };
    allowed.iter().any(|domain| {
        let domain = domain.trim().trim_start_matches("www.").to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    })
}
