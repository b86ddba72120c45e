// ABOUTME: In-memory page driver and launcher for exercising the crawler without a browser or network.
// ABOUTME: Pages are scripted per URL: served, failing, flaky, hanging, or stuck in navigation.

//! Testing utilities.
//!
//! [`ScriptedLauncher`] hands out [`ScriptedDriver`]s that share one page
//! script and one set of counters, so a test can script pages up front and
//! assert afterwards on what was navigated, stopped, launched and closed.
//!
//! ```rust,ignore
//! let launcher = ScriptedLauncher::new();
//! launcher.page("https://www.pokellector.com/search?criteria=Pikachu", LISTING_HTML);
//! launcher.failing_page("https://www.pricecharting.com/search-products?type=prices&q=Pikachu");
//!
//! let crawler = Crawler::builder().launcher(Arc::new(launcher.clone())).build()?;
//! let report = crawler.run("Pikachu").await?;
//! assert_eq!(launcher.closed(), launcher.launched());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::driver::{DriverLauncher, PageDriver, ReadyState};
use crate::error::FetchError;

/// How a scripted URL behaves when navigated to.
#[derive(Debug, Clone)]
enum Script {
    /// Loads completely with this HTML.
    Serve(String),
    /// Navigation fails with a transient error.
    Fail,
    /// Navigation fails this many more times, then serves the HTML.
    Flaky { failures: u32, html: String },
    /// Navigation commits but the page never finishes loading; the partial DOM is readable.
    Hang(String),
    /// Navigation itself never returns; the partial DOM is readable afterwards.
    Stuck(String),
}

#[derive(Debug, Default)]
struct State {
    pages: HashMap<String, Script>,
    navigations: Vec<String>,
    stops: usize,
    launched: usize,
    closed: usize,
    /// Launches allowed before every further launch fails.
    launch_limit: Option<usize>,
}

/// Launcher whose sessions serve scripted pages.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    state: Arc<Mutex<State>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Serve `html` at `url`.
    pub fn page(&self, url: &str, html: &str) -> &Self {
        self.state().pages.insert(url.to_string(), Script::Serve(html.to_string()));
        self
    }

    /// Fail every navigation to `url`.
    pub fn failing_page(&self, url: &str) -> &Self {
        self.state().pages.insert(url.to_string(), Script::Fail);
        self
    }

    /// Fail the first `failures` navigations to `url`, then serve `html`.
    pub fn flaky_page(&self, url: &str, failures: u32, html: &str) -> &Self {
        self.state().pages.insert(
            url.to_string(),
            Script::Flaky {
                failures,
                html: html.to_string(),
            },
        );
        self
    }

    /// A page that never reaches `complete`; `partial` is what the DOM holds.
    pub fn hanging_page(&self, url: &str, partial: &str) -> &Self {
        self.state().pages.insert(url.to_string(), Script::Hang(partial.to_string()));
        self
    }

    /// A page whose navigation never returns.
    pub fn stuck_page(&self, url: &str, partial: &str) -> &Self {
        self.state().pages.insert(url.to_string(), Script::Stuck(partial.to_string()));
        self
    }

    /// Make every subsequent launch fail.
    pub fn fail_launches(&self) -> &Self {
        let mut state = self.state();
        state.launch_limit = Some(state.launched);
        drop(state);
        self
    }

    /// Let `launches` more sessions start, then fail every launch after them.
    pub fn fail_launches_after(&self, launches: usize) -> &Self {
        let mut state = self.state();
        state.launch_limit = Some(state.launched + launches);
        drop(state);
        self
    }

    /// Every URL navigated to, across all sessions, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    pub fn stops(&self) -> usize {
        self.state().stops
    }

    pub fn launched(&self) -> usize {
        self.state().launched
    }

    /// Number of close calls across all sessions; a session closed twice counts twice.
    pub fn closed(&self) -> usize {
        self.state().closed
    }
}

#[async_trait]
impl DriverLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, FetchError> {
        let mut state = self.state();
        if state.launch_limit.is_some_and(|limit| state.launched >= limit) {
            return Err(FetchError::launch(
                "LaunchScripted",
                Some(anyhow::anyhow!("launch disabled by test")),
            ));
        }
        state.launched += 1;
        Ok(Box::new(ScriptedDriver {
            state: Arc::clone(&self.state),
            current: None,
            closed: false,
        }))
    }
}

/// What the driver currently shows.
#[derive(Debug, Clone)]
struct Current {
    html: String,
    complete: bool,
}

/// A page session over the launcher's script.
#[derive(Debug)]
pub struct ScriptedDriver {
    state: Arc<Mutex<State>>,
    current: Option<Current>,
    closed: bool,
}

impl ScriptedDriver {
    fn ensure_open(&self, url: &str, op: &str) -> Result<(), FetchError> {
        if self.closed {
            return Err(FetchError::transient(
                url,
                op,
                Some(anyhow::anyhow!("session already closed")),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.ensure_open(url, "Navigate")?;
        self.current = None;
        let script = {
            let mut state = lock(&self.state);
            state.navigations.push(url.to_string());
            let script = state.pages.get_mut(url);
            match script {
                Some(Script::Flaky { failures, html }) => {
                    if *failures > 0 {
                        *failures -= 1;
                        Script::Fail
                    } else {
                        Script::Serve(html.clone())
                    }
                }
                Some(other) => other.clone(),
                None => Script::Fail,
            }
        };

        match script {
            Script::Serve(html) => {
                self.current = Some(Current {
                    html,
                    complete: true,
                });
                Ok(())
            }
            Script::Hang(html) => {
                self.current = Some(Current {
                    html,
                    complete: false,
                });
                Ok(())
            }
            Script::Stuck(html) => {
                self.current = Some(Current {
                    html,
                    complete: false,
                });
                futures::future::pending::<()>().await;
                Ok(())
            }
            Script::Fail | Script::Flaky { .. } => Err(FetchError::transient(
                url,
                "Navigate",
                Some(anyhow::anyhow!("scripted navigation failure")),
            )),
        }
    }

    async fn ready_state(&mut self) -> Result<ReadyState, FetchError> {
        Ok(match &self.current {
            Some(current) if current.complete => ReadyState::Complete,
            _ => ReadyState::Loading,
        })
    }

    async fn stop_loading(&mut self) -> Result<(), FetchError> {
        lock(&self.state).stops += 1;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        match &self.current {
            Some(current) => Ok(current.html.clone()),
            None => Err(FetchError::transient(
                "",
                "Content",
                Some(anyhow::anyhow!("no page loaded")),
            )),
        }
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        // Repeated closes are no-ops for the session but still counted.
        self.closed = true;
        self.current = None;
        lock(&self.state).closed += 1;
        Ok(())
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}
