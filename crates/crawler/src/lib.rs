// ABOUTME: Main library entry point for the cardex trading-card crawler.
// ABOUTME: Re-exports the public API: Crawler, CrawlerBuilder, CardRecord, CrawlReport, errors, config and drivers.

//! cardex - a trading-card catalog crawler.
//!
//! Given card names, the crawler queries two catalog sites (English and
//! Japanese) and a price aggregator, extracts every listing, and normalizes
//! them into [`CardRecord`]s with prices, images and ISO release dates.
//!
//! # Example
//!
//! ```no_run
//! use cardex_crawler::{CrawlError, Crawler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CrawlError> {
//!     let crawler = Crawler::builder()
//!         .release_table("data/set_data.csv")
//!         .build()?;
//!     let report = crawler.run("Pikachu, Charizard").await?;
//!     for record in &report.records {
//!         println!("{} {} #{} ({})", record.site, record.name, record.card_number, record.release_date);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dates;
pub mod driver;
pub mod error;
pub mod extractors;
pub mod fetcher;
pub mod images;
pub mod normalize;
pub mod options;
pub mod orchestrator;
pub mod record;
pub mod release_index;
pub mod resource;
pub mod session;
pub mod sets;
pub mod source;
pub mod testing;

pub use crate::config::{load_config, load_config_from_str, load_env_config, CrawlConfig};
pub use crate::dates::normalize_date;
pub use crate::driver::{DriverLauncher, PageDriver, ReadyState, Transport};
pub use crate::error::{ConfigError, CrawlError, ErrorCode, FetchError, IndexError};
pub use crate::extractors::rules::{AggregatorRules, CatalogRules, PriceColumn, SetTableRules};
pub use crate::extractors::RawCard;
pub use crate::fetcher::{PageFetcher, RenderedPage};
pub use crate::normalize::{canonical_price_key, split_set_and_number, RecordNormalizer};
pub use crate::options::{ChromeOptions, CrawlerBuilder, Options, Origins, RetryPolicy};
pub use crate::orchestrator::{split_names, Crawler};
pub use crate::record::{write_record_table, CardRecord, CrawlReport, SourceStats, UNKNOWN};
pub use crate::release_index::ReleaseDateIndex;
pub use crate::session::Session;
pub use crate::sets::{write_set_table, SetCatalogCrawler, SetInfo};
pub use crate::source::SourceKind;
