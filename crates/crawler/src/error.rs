// ABOUTME: Error types for the crawler including the FetchError taxonomy and fatal construction errors.
// ABOUTME: FetchError mirrors a categorized error with convenience constructors and boolean helpers.

use std::fmt;
use std::path::PathBuf;

/// Error codes representing the categories of page-fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUrl,
    Transient,
    Timeout,
    Launch,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidUrl => "invalid URL",
            ErrorCode::Transient => "transient fetch error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Launch => "session launch failed",
        };
        write!(f, "{}", s)
    }
}

/// Error raised by page drivers and the page fetcher.
///
/// Everything except `Launch` is absorbed by the fetcher's callers and turned
/// into an empty contribution; nothing above the orchestrator sees it.
#[derive(Debug, thiserror::Error)]
pub struct FetchError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cardex: {} {}: {}", self.op, self.url, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl FetchError {
    fn with_code(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    pub fn invalid_url(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::InvalidUrl, url, op, source)
    }

    /// Navigation, network or DOM-read failure; the page may load on a later attempt.
    pub fn transient(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Transient, url, op, source)
    }

    pub fn timeout(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Timeout, url, op, source)
    }

    /// The driver session could not be opened. Launch errors carry no URL.
    pub fn launch(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::with_code(ErrorCode::Launch, "", op, source)
    }

    pub fn is_transient(&self) -> bool {
        self.code == ErrorCode::Transient
    }

    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }

    pub fn is_invalid_url(&self) -> bool {
        self.code == ErrorCode::InvalidUrl
    }

    pub fn is_launch(&self) -> bool {
        self.code == ErrorCode::Launch
    }
}

/// Errors raised while loading the release-date table.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("release table not readable at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("release table is malformed: {0}")]
    Csv(#[from] csv::Error),

    #[error("release table is missing required column `{0}`")]
    MissingColumn(&'static str),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Fatal errors that abort a crawl before any page is requested.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error(transparent)]
    ReleaseTable(#[from] IndexError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not open a page session: {0}")]
    Session(#[source] FetchError),
}
