// ABOUTME: CLI binary for the cardex trading-card crawler.
// ABOUTME: Crawls card names into JSON or CSV, rebuilds the set table, and extracts saved listing pages.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use cardex_crawler::{
    load_config, load_env_config, write_record_table, write_set_table, CardRecord, CrawlConfig,
    Crawler, CrawlerBuilder, SetCatalogCrawler, SourceKind, Transport,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Exit code for a crawl that ran cleanly but found nothing.
const NO_DATA_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "cardex")]
#[command(about = "Crawl trading-card catalogs and price listings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a comma-separated batch of card names
    Crawl {
        /// Card names, e.g. "Pikachu, Charizard"
        names: String,

        #[command(flatten)]
        common: CommonArgs,

        /// Only crawl these sources (catalog-en, catalog-jp, price-aggregator)
        #[arg(short = 's', long = "source", value_delimiter = ',')]
        sources: Vec<SourceKind>,

        #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Output file path (default: stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Print per-source page statistics to stderr
        #[arg(long = "stats")]
        stats: bool,
    },
    /// Rebuild the release-date table from the catalog set pages
    Sets {
        #[command(flatten)]
        common: CommonArgs,

        /// Output file path (default: stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Extract records from a saved listing page
    Extract {
        /// HTML file to read
        #[arg(long = "html")]
        html: PathBuf,

        /// URL the page was saved from
        #[arg(long = "url")]
        url: String,

        #[arg(long = "source", default_value = "catalog-en")]
        source: SourceKind,

        #[arg(long = "release-table")]
        release_table: Option<PathBuf>,

        #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Config file (TOML); falls back to $CARDEX_CONFIG
    #[arg(short = 'c', long = "config", env = "CARDEX_CONFIG")]
    config: Option<PathBuf>,

    /// CSV with SetName and Release Date columns
    #[arg(long = "release-table")]
    release_table: Option<PathBuf>,

    /// Page transport: chrome or http
    #[arg(long = "transport")]
    transport: Option<Transport>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Csv,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}

/// Load the config file when one is given, else defaults plus environment overrides.
fn load(common: &CommonArgs) -> Result<CrawlConfig> {
    let mut config = match &common.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config from {:?}", path))?,
        None => load_env_config().context("invalid environment configuration")?,
    };
    if let Some(table) = &common.release_table {
        config.release_table = Some(table.clone());
    }
    if let Some(transport) = common.transport {
        config.transport = transport;
    }
    Ok(config)
}

fn render_records(records: &[CardRecord], format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => {
            let mut out = serde_json::to_vec_pretty(records)?;
            out.push(b'\n');
            Ok(out)
        }
        Format::Csv => {
            let mut out = Vec::new();
            write_record_table(&mut out, records)?;
            Ok(out)
        }
    }
}

fn emit(bytes: &[u8], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, bytes).with_context(|| format!("error writing to {:?}", path)),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Crawl {
            names,
            common,
            sources,
            format,
            output,
            stats,
        } => {
            let config = load(&common)?;
            let mut builder = CrawlerBuilder::from_options(config.into_options());
            if !sources.is_empty() {
                builder = builder.sources(sources);
            }
            let crawler = builder.build()?;
            let report = crawler.run(&names).await?;

            if stats {
                for (site, s) in &report.stats {
                    eprintln!(
                        "{site}: {} pages discovered, {} loaded, {} skipped, {} records",
                        s.pages_discovered, s.pages_loaded, s.pages_skipped, s.records
                    );
                }
            }
            if report.is_empty() {
                eprintln!("No data found");
                return Ok(ExitCode::from(NO_DATA_EXIT));
            }
            emit(&render_records(&report.records, format)?, output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Sets { common, output } => {
            let config = load(&common)?;
            let sets = SetCatalogCrawler::new(config.into_options()).run().await?;
            let mut out = Vec::new();
            write_set_table(&mut out, &sets)?;
            emit(&out, output.as_deref())?;
            tracing::info!(sets = sets.len(), "set table written");
            Ok(ExitCode::SUCCESS)
        }
        Command::Extract {
            html,
            url,
            source,
            release_table,
            format,
        } => {
            let page = fs::read_to_string(&html)
                .with_context(|| format!("error reading file {:?}", html))?;
            let mut builder = Crawler::builder();
            if let Some(table) = release_table {
                builder = builder.release_table(table);
            }
            let records = builder.build()?.extract_html(source, &page, &url);
            if records.is_empty() {
                eprintln!("No data found");
                return Ok(ExitCode::from(NO_DATA_EXIT));
            }
            emit(&render_records(&records, format)?, None)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
