// ABOUTME: End-to-end crawl tests over scripted sessions and a mock HTTP server.
// ABOUTME: Fixtures under tests/fixtures stand in for the catalog and aggregator pages.

use std::sync::Arc;
use std::time::Duration;

use cardex_crawler::testing::ScriptedLauncher;
use cardex_crawler::{
    CardRecord, ConfigError, CrawlError, Crawler, CrawlerBuilder, SourceKind, Transport, UNKNOWN,
};
use httpmock::prelude::*;
use pretty_assertions::assert_eq;

const EN_SEARCH: &str = include_str!("fixtures/html/catalog_en_search.html");
const EN_PAGE_1: &str = include_str!("fixtures/html/catalog_en_page1.html");
const JP_SEARCH: &str = include_str!("fixtures/html/catalog_jp_search.html");
const AGG_SEARCH: &str = include_str!("fixtures/html/aggregator_search.html");
const AGG_DETAIL: &str = include_str!("fixtures/html/aggregator_detail.html");

fn set_table() -> String {
    format!("{}/tests/fixtures/set_data.csv", env!("CARGO_MANIFEST_DIR"))
}

fn scripted_sites() -> ScriptedLauncher {
    let launcher = ScriptedLauncher::new();
    launcher
        .page("https://www.pokellector.com/search?criteria=Pikachu", EN_SEARCH)
        .page("https://www.pokellector.com/search?criteria=Pikachu&p=1", EN_PAGE_1)
        .failing_page("https://www.pokellector.com/search?criteria=Pikachu&p=2")
        .page("https://jp.pokellector.com/search?criteria=Pikachu", JP_SEARCH)
        .page(
            "https://www.pricecharting.com/search-products?type=prices&q=Pikachu",
            AGG_SEARCH,
        )
        .page(
            "https://www.pricecharting.com/game/pokemon-base-set/pikachu-58",
            AGG_DETAIL,
        )
        .failing_page("https://www.pricecharting.com/game/pokemon-jungle/pikachu-60");
    launcher
}

fn fast(builder: CrawlerBuilder) -> CrawlerBuilder {
    builder
        .settle_delay(Duration::ZERO)
        .cooldown(Duration::ZERO)
        .poll_interval(Duration::from_millis(5))
}

fn summary(record: &CardRecord) -> (&str, &str, &str, &str, &str) {
    (
        record.site.as_str(),
        record.name.as_str(),
        record.set_name.as_str(),
        record.card_number.as_str(),
        record.release_date.as_str(),
    )
}

#[tokio::test]
async fn crawls_every_source_in_order() {
    let launcher = scripted_sites();
    let crawler = fast(Crawler::builder())
        .launcher(Arc::new(launcher.clone()))
        .release_table(set_table())
        .build()
        .unwrap();

    let report = crawler.run("Pikachu").await.unwrap();

    let rows: Vec<_> = report.records.iter().map(summary).collect();
    assert_eq!(
        rows,
        vec![
            ("catalog-en", "Pikachu", "Base Set", "58", "1999-01-09"),
            ("catalog-en", "Pikachu", "Jungle", "60", "1999-06-16"),
            ("catalog-jp", "Pikachu", "Expansion Pack 20th Anniversary", "26", "2016-03-03"),
            ("price-aggregator", "Pikachu", "Pokemon Base Set", "58", "1999-01-09"),
            ("price-aggregator", "Pikachu", "Pokemon Jungle", "60", UNKNOWN),
        ]
    );

    let base_set = &report.records[0];
    assert_eq!(
        base_set.prices.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<Vec<_>>(),
        vec![
            ("tcgplayer.com/product/42382", "$3.10"),
            ("ebay.com/sch/i.html?_nkw=pikachu+base+set+58", "$4.99"),
        ]
    );
    assert_eq!(
        base_set.images["catalog"],
        "https://den-cards.pokellector.com/119/Pikachu.BS.58.png"
    );

    let jp = &report.records[2];
    assert_eq!(jp.prices["trollandtoad.com/pokemon/pikachu-26/1234"], UNKNOWN);
    assert_eq!(
        jp.images["catalog"],
        "https://den-cards.pokellector.com/jp/Pikachu.CP6.26.png"
    );

    let graded = &report.records[3];
    assert_eq!(graded.prices["pricecharting.com/ungraded"], "$4.50");
    assert_eq!(graded.prices["pricecharting.com/grade-7"], "$19.99");
    assert_eq!(graded.prices["pricecharting.com/grade-8"], "$35.00");
    assert!(graded.images["price-aggregator"].ends_with("pikachu-58/240.jpg"));

    let degraded = &report.records[4];
    assert_eq!(degraded.prices["pricecharting.com/grade-7"], UNKNOWN);
    assert!(!degraded.prices.contains_key("pricecharting.com/grade-8"));
    assert!(degraded.images.is_empty());

    assert!(report.records[1].images.is_empty());
    assert!(report
        .records
        .iter()
        .flat_map(|r| r.images.values())
        .all(|url| !url.contains("placeholder")));

    assert_eq!(launcher.launched(), 2);
    assert_eq!(launcher.closed(), 2);
}

#[tokio::test]
async fn stats_count_discovered_loaded_and_skipped_pages() {
    let launcher = scripted_sites();
    let crawler = fast(Crawler::builder())
        .launcher(Arc::new(launcher))
        .release_table(set_table())
        .build()
        .unwrap();

    let report = crawler.run("Pikachu").await.unwrap();

    let en = &report.stats["catalog-en"];
    assert_eq!((en.pages_discovered, en.pages_loaded, en.pages_skipped, en.records), (2, 1, 1, 2));
    let jp = &report.stats["catalog-jp"];
    assert_eq!((jp.pages_discovered, jp.pages_loaded, jp.pages_skipped, jp.records), (1, 1, 0, 1));
    let agg = &report.stats["price-aggregator"];
    assert_eq!((agg.pages_discovered, agg.pages_loaded, agg.pages_skipped, agg.records), (1, 1, 0, 2));
}

#[tokio::test]
async fn batch_repeats_per_name_and_unknown_names_add_nothing() {
    let launcher = scripted_sites();
    let crawler = fast(Crawler::builder())
        .launcher(Arc::new(launcher.clone()))
        .release_table(set_table())
        .sources([SourceKind::CatalogJp])
        .build()
        .unwrap();

    let report = crawler.run("Pikachu, Missingno").await.unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.records[0].site, "catalog-jp");
    assert_eq!(report.stats.len(), 1);
    assert_eq!(report.stats["catalog-jp"].pages_skipped, 1);
    assert_eq!(launcher.launched(), 1);
    assert_eq!(launcher.closed(), 1);
}

#[tokio::test]
async fn slow_pages_are_stopped_and_partial_dom_is_used() {
    let launcher = ScriptedLauncher::new();
    launcher.hanging_page("https://jp.pokellector.com/search?criteria=Pikachu", JP_SEARCH);
    let crawler = fast(Crawler::builder())
        .launcher(Arc::new(launcher.clone()))
        .sources([SourceKind::CatalogJp])
        .page_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let report = crawler.run("Pikachu").await.unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.records[0].release_date, UNKNOWN);
    assert!(launcher.stops() >= 2);
}

#[tokio::test]
async fn http_transport_crawls_a_live_catalog() {
    let server = MockServer::start();
    let search = server.mock(|when, then| {
        when.method(GET).path("/search").query_param("criteria", "Pikachu");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(JP_SEARCH);
    });

    let crawler = fast(Crawler::builder())
        .transport(Transport::Http)
        .origin(SourceKind::CatalogEn, server.base_url())
        .sources([SourceKind::CatalogEn])
        .release_table(set_table())
        .build()
        .unwrap();

    let report = crawler.run("Pikachu").await.unwrap();

    search.assert_hits(2);
    assert_eq!(report.len(), 1);
    assert_eq!(report.records[0].site, "catalog-en");
    assert_eq!(report.records[0].release_date, "2016-03-03");
}

#[tokio::test]
async fn configured_crawler_uses_file_settings() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("cardex.toml");
    std::fs::write(
        &path,
        format!(
            r#"
release_table = "{}"
sources = ["price-aggregator"]

[timeouts]
settle_ms = 0
cooldown_ms = 0
poll_ms = 5
"#,
            set_table()
        ),
    )
    .unwrap();

    let launcher = scripted_sites();
    let crawler = CrawlerBuilder::from_config_file(&path)
        .unwrap()
        .launcher(Arc::new(launcher.clone()))
        .build()
        .unwrap();

    let report = crawler.run("Pikachu").await.unwrap();

    assert_eq!(report.len(), 2);
    assert!(report.records.iter().all(|r| r.site == "price-aggregator"));
    assert_eq!(launcher.launched(), 1);
}

#[test]
fn invalid_config_file_is_a_config_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("cardex.toml");
    std::fs::write(&path, "[retries]\ndiscovery = 0\n").unwrap();

    let err = CrawlerBuilder::from_config_file(&path).err().unwrap();
    assert!(matches!(err, CrawlError::Config(ConfigError::Validation(_))));
}

#[test]
fn missing_configured_release_table_fails_construction() {
    let err = Crawler::builder()
        .launcher(Arc::new(ScriptedLauncher::new()))
        .release_table("tests/fixtures/nope.csv")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, CrawlError::ReleaseTable(_)));
}
