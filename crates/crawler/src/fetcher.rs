// ABOUTME: Drives one page session to discover pagination and load rendered pages within a time bound.
// ABOUTME: Timeouts force-stop the page and keep partial DOM; transient failures cool down and are retried per policy.

use std::time::Duration;

use scraper::Html;
use url::Url;

use crate::driver::{PageDriver, ReadyState};
use crate::error::FetchError;
use crate::extractors::select::{attr, select_all};
use crate::options::{Options, RetryPolicy};
use crate::source::SourceKind;

/// Pagination links on a search page.
pub const PAGINATION_SELECTOR: &str = "div.pagination a[href]";

/// A rendered page: the URL it was loaded from and its HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
    /// False when the page was force-stopped before it finished loading.
    pub complete: bool,
}

impl RenderedPage {
    /// Parse the HTML. The document is not `Send`, so parse it where it is used.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

/// Page loading over a borrowed driver session.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    pub page_timeout: Duration,
    pub detail_timeout: Duration,
    pub settle_delay: Duration,
    pub stop_timeout: Duration,
    pub poll_interval: Duration,
    pub discovery_retry: RetryPolicy,
    pub page_retry: RetryPolicy,
    pub detail_retry: RetryPolicy,
}

impl PageFetcher {
    pub fn from_options(opts: &Options) -> Self {
        Self {
            page_timeout: opts.page_timeout,
            detail_timeout: opts.detail_timeout,
            settle_delay: opts.settle_delay,
            stop_timeout: opts.stop_timeout,
            poll_interval: opts.poll_interval,
            discovery_retry: opts.discovery_retry,
            page_retry: opts.page_retry,
            detail_retry: opts.detail_retry,
        }
    }

    /// Find the relative paths of every result page for `query`.
    ///
    /// Always returns at least the search page itself: when the page shows
    /// no pagination, or when every discovery attempt fails.
    pub async fn discover_pagination_paths(
        &self,
        driver: &mut dyn PageDriver,
        origin: &str,
        source: SourceKind,
        query: &str,
    ) -> Vec<String> {
        let search_path = source.search_path(query);
        let url = format!("{}{}", origin.trim_end_matches('/'), search_path);
        let policy = self.discovery_retry;

        for attempt in 1..=policy.attempts {
            match self.open_search(driver, &url).await {
                Ok(html) => {
                    let mut paths = pagination_paths(&html, &url);
                    if paths.is_empty() {
                        paths.push(search_path.clone());
                    }
                    tracing::debug!(site = source.tag(), url = %url, pages = paths.len(), "pagination discovered");
                    return paths;
                }
                Err(e) => {
                    tracing::warn!(
                        site = source.tag(),
                        url = %url,
                        attempt,
                        attempts = policy.attempts,
                        error = %e,
                        "pagination discovery failed"
                    );
                    tokio::time::sleep(policy.cooldown).await;
                }
            }
        }

        tracing::warn!(site = source.tag(), url = %url, "falling back to the search page alone");
        vec![search_path]
    }

    /// Load `origin + path` under the page timeout and retry policy.
    pub async fn load_page(
        &self,
        driver: &mut dyn PageDriver,
        origin: &str,
        path: &str,
    ) -> Result<RenderedPage, FetchError> {
        let url = join_origin(origin, path);
        self.load_url(driver, &url, self.page_timeout, self.page_retry).await
    }

    /// Load a product detail page under the detail timeout and retry policy.
    pub async fn load_detail(
        &self,
        driver: &mut dyn PageDriver,
        url: &str,
    ) -> Result<RenderedPage, FetchError> {
        self.load_url(driver, url, self.detail_timeout, self.detail_retry).await
    }

    /// Load an absolute URL, retrying transient failures with a cooldown after each.
    pub async fn load_url(
        &self,
        driver: &mut dyn PageDriver,
        url: &str,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<RenderedPage, FetchError> {
        let mut last_error = None;
        for attempt in 1..=policy.attempts {
            match self.load_once(driver, url, timeout).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::warn!(url, attempt, attempts = policy.attempts, error = %e, "page load failed");
                    tokio::time::sleep(policy.cooldown).await;
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| FetchError::transient(url, "LoadPage", None)))
    }

    async fn load_once(
        &self,
        driver: &mut dyn PageDriver,
        url: &str,
        timeout: Duration,
    ) -> Result<RenderedPage, FetchError> {
        let complete = self.wait_until_ready(driver, url, timeout).await?;
        let html = self.read_dom(driver, url, complete).await?;
        tracing::debug!(url, complete, bytes = html.len(), "page loaded");
        Ok(RenderedPage {
            url: url.to_string(),
            html,
            complete,
        })
    }

    async fn open_search(&self, driver: &mut dyn PageDriver, url: &str) -> Result<String, FetchError> {
        let complete = self.wait_until_ready(driver, url, self.page_timeout).await?;
        tokio::time::sleep(self.settle_delay).await;
        self.read_dom(driver, url, complete).await
    }

    /// Navigate and poll the ready state. `Ok(false)` means the timeout elapsed first.
    async fn wait_until_ready(
        &self,
        driver: &mut dyn PageDriver,
        url: &str,
        timeout: Duration,
    ) -> Result<bool, FetchError> {
        let poll_interval = self.poll_interval;
        let loading = async {
            driver.navigate(url).await?;
            loop {
                if driver.ready_state().await? == ReadyState::Complete {
                    return Ok::<(), FetchError>(());
                }
                tokio::time::sleep(poll_interval).await;
            }
        };
        match tokio::time::timeout(timeout, loading).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(url, timeout_ms = timeout.as_millis() as u64, "still loading, forcing stop");
                Ok(false)
            }
        }
    }

    /// Stop an unfinished page and read its DOM, bounded by the stop timeout.
    async fn read_dom(
        &self,
        driver: &mut dyn PageDriver,
        url: &str,
        complete: bool,
    ) -> Result<String, FetchError> {
        let read = async {
            if !complete {
                if let Err(e) = driver.stop_loading().await {
                    tracing::debug!(url, error = %e, "stop loading failed, reading DOM anyway");
                }
            }
            driver.content().await
        };
        match tokio::time::timeout(self.stop_timeout, read).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(
                url,
                "ReadPage",
                Some(anyhow::anyhow!("DOM not readable within {:?}", self.stop_timeout)),
            )),
        }
    }
}

/// Join an origin and a relative path into an absolute URL.
pub fn join_origin(origin: &str, path: &str) -> String {
    let origin = origin.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{origin}{path}")
    } else {
        format!("{origin}/{path}")
    }
}

/// Relative paths of the pagination links on a search page, deduplicated in order.
///
/// Links are resolved against the search URL; links to another host are dropped.
pub fn pagination_paths(html: &str, search_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(search_url) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut paths: Vec<String> = Vec::new();
    for link in select_all(doc.root_element(), PAGINATION_SELECTOR) {
        let Some(href) = attr(link, "href") else {
            continue;
        };
        let Ok(resolved) = base.join(&href) else {
            continue;
        };
        if resolved.host_str() != base.host_str() {
            continue;
        }
        let mut path = resolved.path().to_string();
        if let Some(query) = resolved.query() {
            path.push('?');
            path.push_str(query);
        }
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}
