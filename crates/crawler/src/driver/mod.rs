// ABOUTME: PageDriver abstraction over "load URL, read rendered DOM" transports.
// ABOUTME: Defines the driver and launcher traits plus the Transport selector used by configuration.

//! Page drivers.
//!
//! A driver is one single-threaded page session: it navigates, reports the
//! document ready state, can be told to stop loading, and hands back the
//! current DOM serialized as HTML. Two transports are provided:
//!
//! - `chrome`: a headless Chromium session over the DevTools protocol, for
//!   pages rendered client-side.
//! - `http`: plain GET requests, for origins that serve complete HTML.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::options::Options;

pub mod chrome;
pub mod http;

pub use chrome::{ChromeDriver, ChromeLauncher};
pub use http::{HttpDriver, HttpLauncher};

/// `document.readyState` as reported by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    /// Parses the DOM's ready-state string; anything unrecognized counts as loading.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "complete" => ReadyState::Complete,
            "interactive" => ReadyState::Interactive,
            _ => ReadyState::Loading,
        }
    }
}

/// One exclusive page session.
///
/// Implementations are never shared between concurrent fetches; callers hold
/// them behind `&mut`.
#[async_trait]
pub trait PageDriver: Send {
    /// Starts navigating to an absolute URL. May return before the page finishes loading.
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    /// Reports the current document ready state.
    async fn ready_state(&mut self) -> Result<ReadyState, FetchError>;

    /// Halts any in-flight page load so the partial DOM can be read.
    async fn stop_loading(&mut self) -> Result<(), FetchError>;

    /// Returns the current DOM serialized as HTML.
    async fn content(&mut self) -> Result<String, FetchError>;

    /// Releases the session. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<(), FetchError>;
}

/// Opens new driver sessions.
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, FetchError>;
}

/// Which transport backs page sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Chrome,
    Http,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Transport::Chrome => "chrome",
            Transport::Http => "http",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chrome" | "browser" => Ok(Transport::Chrome),
            "http" => Ok(Transport::Http),
            other => Err(format!("unknown transport `{}`", other)),
        }
    }
}

/// Builds the launcher for the configured transport.
pub fn launcher_for(opts: &Options) -> Arc<dyn DriverLauncher> {
    match opts.transport {
        Transport::Chrome => Arc::new(ChromeLauncher::from_options(opts)),
        Transport::Http => Arc::new(HttpLauncher::from_options(opts)),
    }
}
