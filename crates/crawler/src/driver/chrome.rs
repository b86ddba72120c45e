// ABOUTME: Headless Chromium page driver built on the DevTools protocol.
// ABOUTME: Navigates without waiting for load, polls readyState, and can force-stop hanging pages.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{NavigateParams, StopLoadingParams};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::driver::{DriverLauncher, PageDriver, ReadyState};
use crate::error::FetchError;
use crate::options::Options;

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl ChromeLauncher {
    pub fn from_options(opts: &Options) -> Self {
        Self {
            headless: opts.chrome.headless,
            executable: opts.chrome.executable.clone(),
            user_agent: opts.user_agent.clone(),
            request_timeout: opts.page_timeout.max(Duration::from_secs(5)),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, FetchError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.request_timeout)
            .arg(format!("--user-agent={}", self.user_agent));
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(ref exe) = self.executable {
            builder = builder.chrome_executable(exe);
        }
        builder
            .build()
            .map_err(|e| FetchError::launch("BrowserConfig", Some(anyhow::anyhow!(e))))
    }
}

#[async_trait]
impl DriverLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, FetchError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::launch("LaunchBrowser", Some(anyhow::Error::new(e))))?;

        // The handler must be polled for the browser connection to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(FetchError::launch("NewPage", Some(anyhow::Error::new(e))));
            }
        };

        tracing::debug!(headless = self.headless, "chrome session launched");
        Ok(Box::new(ChromeDriver {
            browser: Some(browser),
            page: Some(page),
            handler_task: Some(handler_task),
            current_url: String::new(),
        }))
    }
}

/// A single Chromium tab driven over CDP.
pub struct ChromeDriver {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    current_url: String,
}

impl ChromeDriver {
    fn page(&self, op: &str) -> Result<&Page, FetchError> {
        self.page.as_ref().ok_or_else(|| {
            FetchError::transient(
                self.current_url.as_str(),
                op,
                Some(anyhow::anyhow!("session already closed")),
            )
        })
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.current_url = url.to_string();
        let page = self.page("Navigate")?;
        // Page.navigate returns once the navigation commits, not when the load event fires.
        let response = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| FetchError::transient(url, "Navigate", Some(anyhow::Error::new(e))))?;
        if let Some(ref error_text) = response.result.error_text {
            if !error_text.is_empty() {
                return Err(FetchError::transient(
                    url,
                    "Navigate",
                    Some(anyhow::anyhow!("{}", error_text)),
                ));
            }
        }
        Ok(())
    }

    async fn ready_state(&mut self) -> Result<ReadyState, FetchError> {
        let url = self.current_url.clone();
        let page = self.page("ReadyState")?;
        let state: String = page
            .evaluate("document.readyState")
            .await
            .map_err(|e| FetchError::transient(url.as_str(), "ReadyState", Some(anyhow::Error::new(e))))?
            .into_value()
            .map_err(|e| FetchError::transient(url.as_str(), "ReadyState", Some(anyhow::Error::new(e))))?;
        Ok(ReadyState::parse(&state))
    }

    async fn stop_loading(&mut self) -> Result<(), FetchError> {
        let url = self.current_url.clone();
        let page = self.page("StopLoading")?;
        page.execute(StopLoadingParams::default())
            .await
            .map_err(|e| FetchError::transient(url, "StopLoading", Some(anyhow::Error::new(e))))?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        let url = self.current_url.clone();
        let page = self.page("Content")?;
        page.content()
            .await
            .map_err(|e| FetchError::transient(url, "Content", Some(anyhow::Error::new(e))))
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        let mut first_error = None;
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                first_error.get_or_insert(FetchError::transient(
                    "",
                    "ClosePage",
                    Some(anyhow::Error::new(e)),
                ));
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                first_error.get_or_insert(FetchError::transient(
                    "",
                    "CloseBrowser",
                    Some(anyhow::Error::new(e)),
                ));
            }
            let _ = browser.wait().await;
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
