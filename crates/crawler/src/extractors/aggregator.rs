// ABOUTME: Extractor for the price aggregator's product table and per-product detail pages.
// ABOUTME: Rows yield name, number, set and graded prices; detail pages add release date and image.

use scraper::{ElementRef, Html};
use url::Url;

use crate::driver::PageDriver;
use crate::extractors::rules::AggregatorRules;
use crate::extractors::select::{attr, element_text, first_text, select_all, select_first};
use crate::extractors::{bare_host, AggregatorItem, GradePrice, RawCard, SetNumber, SourceExtractor};
use crate::fetcher::PageFetcher;
use crate::images::accept_image;
use crate::source::SourceKind;

/// Fields read from a product's own page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    /// Raw release-date text, normalized later.
    pub release_date: Option<String>,
    pub image: Option<String>,
}

/// Extracts [`AggregatorItem`]s from the product table of a search page.
#[derive(Debug, Clone)]
pub struct AggregatorExtractor<'a> {
    rules: &'a AggregatorRules,
    placeholders: &'a [String],
    price_host: String,
}

impl<'a> AggregatorExtractor<'a> {
    /// `origin` is the aggregator's base URL; its host keys the graded prices.
    pub fn new(rules: &'a AggregatorRules, placeholders: &'a [String], origin: &str) -> Self {
        Self {
            rules,
            placeholders,
            price_host: bare_host(origin).unwrap_or_else(|| SourceKind::PriceAggregator.tag().to_string()),
        }
    }

    fn row(&self, row: ElementRef<'_>, page_url: &str) -> AggregatorItem {
        let title = select_first(row, &self.rules.title);
        let (name, number) = match title.map(element_text) {
            Some(text) if !text.is_empty() => split_title(&text),
            _ => (None, None),
        };
        let detail_url = title
            .and_then(|link| attr(link, "href"))
            .and_then(|href| resolve_link(&href, page_url));

        let prices = self
            .rules
            .price_columns
            .iter()
            .filter_map(|column| {
                let cell = select_first(row, &column.selector)?;
                let text = element_text(cell);
                Some(GradePrice {
                    grade: column.grade.clone(),
                    price: (!text.is_empty()).then_some(text),
                })
            })
            .collect();

        AggregatorItem {
            name,
            set: SetNumber::Split {
                set: first_text(row, &self.rules.set),
                number,
            },
            prices,
            price_host: self.price_host.clone(),
            detail_url,
            detail: DetailFields::default(),
        }
    }

    /// Read the release date and image from a product detail page.
    pub fn parse_detail(&self, doc: &Html, page_url: &str) -> DetailFields {
        let root = doc.root_element();
        let release_date = select_all(root, &self.rules.detail_attribute_row)
            .into_iter()
            .find(|row| {
                first_text(*row, &self.rules.detail_label).is_some_and(|label| {
                    label
                        .to_lowercase()
                        .contains(&self.rules.release_label.to_lowercase())
                })
            })
            .and_then(|row| first_text(row, &self.rules.detail_value));

        let image = self.rules.detail_image.iter().find_map(|css| {
            let img = select_first(root, css)?;
            ["src", "data-src"]
                .into_iter()
                .filter_map(|name| attr(img, name))
                .find_map(|src| accept_image(&src, Some(page_url), self.placeholders))
        });

        DetailFields {
            release_date,
            image,
        }
    }

    /// Visit each row's detail page and attach what it offers.
    ///
    /// A detail page that fails or times out leaves that row's release date
    /// and image absent; the remaining rows are still enriched.
    pub async fn enrich_details(
        &self,
        fetcher: &PageFetcher,
        driver: &mut dyn PageDriver,
        cards: &mut [RawCard],
    ) {
        for card in cards.iter_mut() {
            let RawCard::Aggregator(item) = card else {
                continue;
            };
            let Some(url) = item.detail_url.clone() else {
                continue;
            };
            match fetcher.load_detail(driver, &url).await {
                Ok(page) => {
                    item.detail = self.parse_detail(&page.document(), &page.url);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "detail page unavailable, keeping row without it");
                }
            }
        }
    }
}

impl SourceExtractor for AggregatorExtractor<'_> {
    fn extract(&self, doc: &Html, page_url: &str, _source: SourceKind) -> Vec<RawCard> {
        select_all(doc.root_element(), &self.rules.row)
            .into_iter()
            .map(|row| RawCard::Aggregator(self.row(row, page_url)))
            .collect()
    }
}

/// Split "Pikachu #58" into name and number. Titles without a number keep the whole text.
pub fn split_title(title: &str) -> (Option<String>, Option<String>) {
    if let Some((name, number)) = title.rsplit_once('#') {
        let name = name.trim();
        let number = number.trim();
        if !number.is_empty() && !number.contains(char::is_whitespace) {
            let name = (!name.is_empty()).then(|| name.to_string());
            return (name, Some(number.to_string()));
        }
    }
    let title = title.trim();
    ((!title.is_empty()).then(|| title.to_string()), None)
}

fn resolve_link(href: &str, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::default_placeholders;
    use pretty_assertions::assert_eq;

    const ORIGIN: &str = "https://www.pricecharting.com";
    const PAGE_URL: &str = "https://www.pricecharting.com/search-products?type=prices&q=Pikachu";

    const TABLE: &str = r#"
        <table id="games_table"><tbody>
          <tr id="product-1001">
            <td class="title"><a href="/game/pokemon-base-set/pikachu-58">Pikachu #58</a></td>
            <td class="console">Pokemon Base Set</td>
            <td class="used_price"><span class="js-price">$4.50</span></td>
            <td class="cib_price"><span class="js-price">$20.00</span></td>
            <td class="new_price"><span class="js-price"></span></td>
          </tr>
          <tr id="product-1002">
            <td class="title"><a href="/game/pokemon-promo/pikachu-illustrator">Pikachu Illustrator</a></td>
            <td class="used_price">$5,000,000.00</td>
          </tr>
        </tbody></table>
    "#;

    fn items(html: &str) -> Vec<AggregatorItem> {
        let rules = AggregatorRules::default();
        let placeholders = default_placeholders();
        let extractor = AggregatorExtractor::new(&rules, &placeholders, ORIGIN);
        let doc = Html::parse_document(html);
        extractor
            .extract(&doc, PAGE_URL, SourceKind::PriceAggregator)
            .into_iter()
            .map(|raw| match raw {
                RawCard::Aggregator(item) => item,
                other => panic!("unexpected raw card {other:?}"),
            })
            .collect()
    }

    #[test]
    fn rows_yield_name_number_set_and_prices() {
        let rows = items(TABLE);
        assert_eq!(rows.len(), 2);
        let first = &rows[0];
        assert_eq!(first.name.as_deref(), Some("Pikachu"));
        assert_eq!(
            first.set,
            SetNumber::Split {
                set: Some("Pokemon Base Set".into()),
                number: Some("58".into()),
            }
        );
        assert_eq!(first.price_host, "pricecharting.com");
        assert_eq!(
            first.prices,
            vec![
                GradePrice { grade: "ungraded".into(), price: Some("$4.50".into()) },
                GradePrice { grade: "grade-7".into(), price: Some("$20.00".into()) },
                GradePrice { grade: "grade-8".into(), price: None },
            ]
        );
        assert_eq!(
            first.detail_url.as_deref(),
            Some("https://www.pricecharting.com/game/pokemon-base-set/pikachu-58")
        );
    }

    #[test]
    fn absent_columns_are_omitted() {
        let rows = items(TABLE);
        let second = &rows[1];
        assert_eq!(second.name.as_deref(), Some("Pikachu Illustrator"));
        assert_eq!(second.set, SetNumber::Split { set: None, number: None });
        assert_eq!(second.prices.len(), 1);
        assert_eq!(second.prices[0].grade, "ungraded");
    }

    #[test]
    fn title_split_handles_missing_number() {
        assert_eq!(split_title("Pikachu #58"), (Some("Pikachu".into()), Some("58".into())));
        assert_eq!(split_title("Pikachu V #SWSH061"), (Some("Pikachu V".into()), Some("SWSH061".into())));
        assert_eq!(split_title("Pikachu"), (Some("Pikachu".into()), None));
        assert_eq!(split_title("Pikachu # promo card"), (Some("Pikachu # promo card".into()), None));
    }

    #[test]
    fn detail_page_release_date_and_image() {
        let rules = AggregatorRules::default();
        let placeholders = default_placeholders();
        let extractor = AggregatorExtractor::new(&rules, &placeholders, ORIGIN);
        let doc = Html::parse_document(
            r#"<div id="product_details">
                 <div class="cover"><img src="https://storage.googleapis.com/images.pricecharting.com/pikachu/240.jpg"></div>
               </div>
               <table id="attribute">
                 <tr><td class="title">Genre:</td><td class="details">Pokemon Card</td></tr>
                 <tr><td class="title">Release Date:</td><td class="details">January 9, 1999</td></tr>
               </table>"#,
        );
        let detail = extractor.parse_detail(&doc, "https://www.pricecharting.com/game/x");
        assert_eq!(detail.release_date.as_deref(), Some("January 9, 1999"));
        assert_eq!(
            detail.image.as_deref(),
            Some("https://storage.googleapis.com/images.pricecharting.com/pikachu/240.jpg")
        );
    }

    #[test]
    fn detail_page_placeholder_image_is_rejected() {
        let rules = AggregatorRules::default();
        let placeholders = default_placeholders();
        let extractor = AggregatorExtractor::new(&rules, &placeholders, ORIGIN);
        let doc = Html::parse_document(
            r#"<div id="product_details"><img src="/images/no-image-available.png"></div>"#,
        );
        let detail = extractor.parse_detail(&doc, "https://www.pricecharting.com/game/x");
        assert_eq!(detail, DetailFields::default());
    }
}
