// ABOUTME: Integration tests for the cardex CLI binary.
// ABOUTME: Tests offline extraction, HTTP-transport crawls against a mock server, and the set table export.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

const EN_PAGE_1: &str = include_str!("fixtures/html/catalog_en_page1.html");

fn cardex_cmd() -> Command {
    let mut cmd = Command::cargo_bin("cardex").unwrap();
    cmd.env_remove("CARDEX_CONFIG").env("RUST_LOG", "warn");
    cmd
}

fn set_table() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/set_data.csv")
}

/// A config pointing both catalogs at `origin`, with no waits between attempts.
fn write_config(dir: &TempDir, origin: &str, sources: &str) -> PathBuf {
    let path = dir.path().join("cardex.toml");
    fs::write(
        &path,
        format!(
            r#"
transport = "http"
sources = [{sources}]

[origins]
catalog_en = "{origin}"
catalog_jp = "{origin}"

[timeouts]
settle_ms = 0
cooldown_ms = 0
"#
        ),
    )
    .unwrap();
    path
}

#[test]
fn extract_saved_listing_as_json() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("listing.html");
    fs::write(&html_path, EN_PAGE_1).unwrap();

    cardex_cmd()
        .arg("extract")
        .arg("--html")
        .arg(&html_path)
        .arg("--url")
        .arg("https://www.pokellector.com/search?criteria=Pikachu")
        .arg("--release-table")
        .arg(set_table())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"set_name\": \"Base Set\""))
        .stdout(predicate::str::contains("\"release_date\": \"1999-01-09\""))
        .stdout(predicate::str::contains("card-placeholder").not());
}

#[test]
fn extract_saved_listing_as_csv() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("listing.html");
    fs::write(&html_path, EN_PAGE_1).unwrap();

    cardex_cmd()
        .args(["extract", "--format", "csv", "--url", "https://www.pokellector.com/search"])
        .arg("--html")
        .arg(&html_path)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Name,Images,Set,Card Number,Prices,Site,Release Date\n",
        ))
        .stdout(predicate::str::contains("Pikachu,{},Jungle,60,{},catalog-en,unknown"));
}

#[test]
fn extract_without_cards_reports_no_data() {
    let temp_dir = TempDir::new().unwrap();
    let html_path = temp_dir.path().join("empty.html");
    fs::write(&html_path, "<html><body><p>No results</p></body></html>").unwrap();

    cardex_cmd()
        .arg("extract")
        .arg("--html")
        .arg(&html_path)
        .arg("--url")
        .arg("https://www.pokellector.com/search")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No data found"));
}

#[test]
fn crawl_over_http_writes_output_file() {
    let server = MockServer::start();
    let search = server.mock(|when, then| {
        when.method(GET).path("/search").query_param("criteria", "Pikachu");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(EN_PAGE_1);
    });

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.base_url(), r#""catalog-en""#);
    let output = temp_dir.path().join("cards.csv");

    cardex_cmd()
        .arg("crawl")
        .arg("Pikachu")
        .arg("--config")
        .arg(&config)
        .arg("--release-table")
        .arg(set_table())
        .args(["--format", "csv", "--stats"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("catalog-en: 1 pages discovered, 1 loaded, 0 skipped, 2 records"));

    search.assert_hits(2);
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("Name,Images,Set,Card Number,Prices,Site,Release Date\n"));
    assert!(written.contains("Base Set,58"));
    assert!(written.contains("1999-01-09"));
    assert_eq!(written.lines().count(), 3);
}

#[test]
fn crawl_with_no_results_exits_with_no_data() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/search");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body("<html><body><div id=\"searchResults\"></div></body></html>");
    });

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.base_url(), r#""catalog-en", "catalog-jp""#);

    cardex_cmd()
        .arg("crawl")
        .arg("Missingno")
        .env("CARDEX_CONFIG", &config)
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No data found"));
}

#[test]
fn missing_config_file_is_an_error() {
    cardex_cmd()
        .args(["crawl", "Pikachu", "--config", "/nonexistent/cardex.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn sets_rebuilds_the_release_table() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/sets");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(r#"<div id="columnLeft"><a href="/Surging-Sparks-Expansion/">Surging Sparks</a></div>"#);
    });
    server.mock(|when, then| {
        when.method(GET).path("/Surging-Sparks-Expansion/");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(
                r#"<div class="breadcrumbs"><a href="/">Pokemon</a> &raquo; <a href="/sets">Scarlet &amp; Violet</a> &raquo; Surging Sparks</div>
                   <div class="setinfo">
                     <div class="description">Eighth expansion.</div>
                     <div class="cards"><span>Cards</span><span>191</span><cite>+61 Secret</cite></div>
                     <div class="released"><span>Released</span><span>Nov 8th</span><cite>2024</cite></div>
                   </div>"#,
            );
    });

    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, &server.base_url(), r#""catalog-en""#);
    let output = temp_dir.path().join("set_data.csv");

    cardex_cmd()
        .arg("sets")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let written = fs::read_to_string(&output).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("URL,Category,Series,SetName,Description,Card Count,Secret Card Count,Release Date")
    );
    // Both catalogs point at the mock server, so the set is listed once per catalog.
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].ends_with("Pokemon,Scarlet & Violet,Surging Sparks,Eighth expansion.,191,61,Nov 8th 2024"));
}
