// ABOUTME: Plain HTTP page driver backed by reqwest.
// ABOUTME: Each navigation fetches the full body, so the page is always complete once navigate returns.

use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{DriverLauncher, PageDriver, ReadyState};
use crate::error::FetchError;
use crate::options::Options;
use crate::resource::{fetch, FetchOptions};

/// Builds an HTTP client per session.
#[derive(Debug, Clone)]
pub struct HttpLauncher {
    pub user_agent: String,
    pub timeout: Duration,
    pub fetch_options: FetchOptions,
}

impl HttpLauncher {
    pub fn from_options(opts: &Options) -> Self {
        Self {
            user_agent: opts.user_agent.clone(),
            timeout: opts.page_timeout,
            fetch_options: FetchOptions {
                headers: opts.headers.clone(),
                ..FetchOptions::default()
            },
        }
    }
}

#[async_trait]
impl DriverLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::launch("HttpClient", Some(anyhow::Error::new(e))))?;
        Ok(Box::new(HttpDriver::new(client, self.fetch_options.clone())))
    }
}

/// A page session over plain HTTP.
pub struct HttpDriver {
    client: Option<reqwest::Client>,
    opts: FetchOptions,
    body: Option<String>,
    current_url: String,
}

impl HttpDriver {
    pub fn new(client: reqwest::Client, opts: FetchOptions) -> Self {
        Self {
            client: Some(client),
            opts,
            body: None,
            current_url: String::new(),
        }
    }
}

#[async_trait]
impl PageDriver for HttpDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.body = None;
        self.current_url = url.to_string();
        let client = self.client.as_ref().ok_or_else(|| {
            FetchError::transient(url, "Navigate", Some(anyhow::anyhow!("session already closed")))
        })?;
        let page = fetch(client, url, &self.opts).await?;
        self.current_url = page.final_url;
        self.body = Some(page.html);
        Ok(())
    }

    async fn ready_state(&mut self) -> Result<ReadyState, FetchError> {
        Ok(if self.body.is_some() {
            ReadyState::Complete
        } else {
            ReadyState::Loading
        })
    }

    async fn stop_loading(&mut self) -> Result<(), FetchError> {
        Ok(())
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        self.body.clone().ok_or_else(|| {
            FetchError::transient(
                self.current_url.as_str(),
                "Content",
                Some(anyhow::anyhow!("no page loaded")),
            )
        })
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.client = None;
        self.body = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn launcher() -> HttpLauncher {
        HttpLauncher {
            user_agent: "cardex-test".to_string(),
            timeout: Duration::from_secs(5),
            fetch_options: FetchOptions::default(),
        }
    }

    #[tokio::test]
    async fn navigate_then_read_content() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search").query_param("criteria", "Pikachu");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<html><body><div class=\"cardresult\"></div></body></html>");
        });

        let mut driver = launcher().launch().await.unwrap();
        assert_eq!(driver.ready_state().await.unwrap(), ReadyState::Loading);
        driver
            .navigate(&server.url("/search?criteria=Pikachu"))
            .await
            .unwrap();
        assert_eq!(driver.ready_state().await.unwrap(), ReadyState::Complete);
        assert!(driver.content().await.unwrap().contains("cardresult"));
        driver.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_navigation_is_transient_and_clears_page() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).body("<p>ok</p>");
        });
        server.mock(|when, then| {
            when.method(GET).path("/down");
            then.status(502);
        });

        let mut driver = launcher().launch().await.unwrap();
        driver.navigate(&server.url("/ok")).await.unwrap();
        let err = driver.navigate(&server.url("/down")).await.unwrap_err();
        assert!(err.is_transient());
        assert!(driver.content().await.is_err());
    }

    #[tokio::test]
    async fn closed_driver_refuses_navigation() {
        let mut driver = launcher().launch().await.unwrap();
        driver.close().await.unwrap();
        driver.close().await.unwrap();
        let err = driver.navigate("http://127.0.0.1:9/").await.unwrap_err();
        assert!(err.is_transient());
    }
}
